//! Database connection pool and migrations

use anyhow::{Context, Result};
use backoff::ExponentialBackoff;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Settings;

/// Connect to PostgreSQL, retrying with exponential backoff until
/// `DATABASE_CONNECT_TIMEOUT_SECONDS` have passed.
pub async fn create_pool(settings: &Settings) -> Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(&settings.database_url)
        .context("Invalid DATABASE_URL")?
        .application_name("gigmarket-backend");

    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(settings.database_connect_timeout_seconds)),
        ..ExponentialBackoff::default()
    };

    let pool = backoff::future::retry(policy, || async {
        PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(connect_options.clone())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "PostgreSQL not reachable yet, retrying");
                backoff::Error::transient(e)
            })
    })
    .await
    .context("Failed to connect to PostgreSQL")?;

    tracing::info!(
        max_connections = settings.database_max_connections,
        "Database connection pool established"
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
