use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::core::shutdown::ShutdownHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    shutdown: ShutdownHandle,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, shutdown: ShutdownHandle) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, shutdown }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn shutdown(&self) -> &ShutdownHandle {
        &self.inner.shutdown
    }
}
