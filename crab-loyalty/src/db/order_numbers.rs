//! Order number counter rows

use shared::models::OrderNumberConfig;
use sqlx::PgConnection;

const COLUMNS: &str =
    "restaurant_id, starting_number, current_number, reset_period, weekly_start_day, last_reset_date";

/// Lock the restaurant's counter, creating it with defaults on first use
pub async fn lock_or_create(
    conn: &mut PgConnection,
    restaurant_id: i64,
) -> Result<OrderNumberConfig, sqlx::Error> {
    let defaults = OrderNumberConfig::new(restaurant_id);
    sqlx::query(
        "INSERT INTO order_number_configs
             (restaurant_id, starting_number, current_number, reset_period, weekly_start_day)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (restaurant_id) DO NOTHING",
    )
    .bind(restaurant_id)
    .bind(defaults.starting_number)
    .bind(defaults.current_number)
    .bind(defaults.reset_period)
    .bind(defaults.weekly_start_day)
    .execute(&mut *conn)
    .await?;

    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM order_number_configs WHERE restaurant_id = $1 FOR UPDATE"
    ))
    .bind(restaurant_id)
    .fetch_one(conn)
    .await
}

pub async fn save(conn: &mut PgConnection, config: &OrderNumberConfig) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE order_number_configs
         SET current_number = $2, last_reset_date = $3
         WHERE restaurant_id = $1",
    )
    .bind(config.restaurant_id)
    .bind(config.current_number)
    .bind(config.last_reset_date)
    .execute(conn)
    .await?;
    Ok(())
}
