pub(crate) mod models;
pub(crate) mod types;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};

use crate::core::config::Settings;

fn pool_options(settings: &Settings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.database().max_connections.max(1))
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .test_before_acquire(true)
}

fn connect_options(settings: &Settings) -> Result<PgConnectOptions, sqlx::Error> {
    let options: PgConnectOptions = settings.database().database_url().parse()?;
    Ok(options
        .application_name("schoolhub-rust")
        .log_statements(tracing::log::LevelFilter::Off))
}

pub(crate) async fn init_pool(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    pool_options(settings).connect_with(connect_options(settings)?).await
}

/// Pool that opens connections on first use; lets the router be exercised
/// without a reachable database.
#[cfg(test)]
pub(crate) fn lazy_pool(settings: &Settings) -> PgPool {
    match connect_options(settings) {
        Ok(options) => pool_options(settings).connect_lazy_with(options),
        Err(err) => panic!("invalid database url in test settings: {err}"),
    }
}

pub(crate) async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
