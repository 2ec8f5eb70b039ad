pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, shutdown, state::AppState, telemetry};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    if settings.security().secret_key_generated {
        tracing::warn!("SECRET_KEY not set; using a generated key persisted on disk");
    }

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let (shutdown_tx, shutdown_handle) = shutdown::channel();
    let state = AppState::new(settings, db_pool, shutdown_handle);

    if let Err(err) = core::bootstrap::ensure_first_principal(&state).await {
        tracing::error!(error = %err, "Failed to ensure first principal");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "SchoolHub API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal(shutdown_tx))
        .await?;

    state.db().close().await;
    tracing::info!("Database pool closed");

    Ok(())
}
