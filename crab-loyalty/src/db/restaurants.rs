//! Restaurant directory queries

use rust_decimal::Decimal;
use shared::models::Restaurant;
use sqlx::PgPool;

const COLUMNS: &str =
    "id, name, owner_account_id, timezone, loyalty_config, last_active_at, created_at";

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Restaurant>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM restaurants WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Resolve a restaurant by name; the most recently active one wins on duplicates
pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Restaurant>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM restaurants WHERE name = $1
         ORDER BY last_active_at DESC NULLS LAST, created_at DESC
         LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Platform commission rate, `None` when the settings row was never written
pub async fn commission_rate(pool: &PgPool) -> Result<Option<Decimal>, sqlx::Error> {
    let row: Option<(Decimal,)> =
        sqlx::query_as("SELECT commission_rate FROM platform_settings WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(rate,)| rate))
}
