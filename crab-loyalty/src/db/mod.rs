//! Database access layer
//!
//! Free functions over `&PgPool` for reads and `&mut PgConnection` for
//! statements that must run inside a caller-owned transaction.

pub mod gifts;
pub mod order_numbers;
pub mod orders;
pub mod points;
pub mod reset;
pub mod restaurants;
pub mod visitors;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connect the pool; every connection gets the configured lock and statement timeouts
pub async fn connect(config: &Config) -> Result<PgPool, BoxError> {
    let lock_timeout = config.db_lock_timeout_ms;
    let statement_timeout = config.db_statement_timeout_ms;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(
                    format!(
                        "SET lock_timeout = {lock_timeout}; SET statement_timeout = {statement_timeout}"
                    )
                    .as_str(),
                )
                .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        lock_timeout_ms = lock_timeout,
        statement_timeout_ms = statement_timeout,
        "Database connected"
    );
    Ok(pool)
}

/// Apply pending schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), BoxError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
