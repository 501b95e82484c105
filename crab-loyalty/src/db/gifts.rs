//! Gift rows

use shared::models::{Gift, GiftStatus};
use sqlx::{PgConnection, PgPool};

const COLUMNS: &str = "id, restaurant_id, device_id, gift_type, euro_value, percentage_value, \
                       status, order_id, created_at";

/// Lock a gift owned by (restaurant, device) for the rest of the transaction
pub async fn lock(
    conn: &mut PgConnection,
    gift_id: i64,
    restaurant_id: i64,
    device_id: &str,
) -> Result<Option<Gift>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM gifts
         WHERE id = $1 AND restaurant_id = $2 AND device_id = $3
         FOR UPDATE"
    ))
    .bind(gift_id)
    .bind(restaurant_id)
    .bind(device_id)
    .fetch_optional(conn)
    .await
}

pub async fn set_status(
    conn: &mut PgConnection,
    gift_id: i64,
    status: GiftStatus,
    order_id: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE gifts SET status = $2, order_id = COALESCE($3, order_id) WHERE id = $1")
        .bind(gift_id)
        .bind(status)
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Unused and converted gifts of a visitor, newest first
pub async fn list_visible(
    pool: &PgPool,
    restaurant_id: i64,
    device_id: &str,
) -> Result<Vec<Gift>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM gifts
         WHERE restaurant_id = $1 AND device_id = $2 AND status IN ('unused', 'converted')
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(restaurant_id)
    .bind(device_id)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, gift_id: i64) -> Result<Option<Gift>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM gifts WHERE id = $1"))
        .bind(gift_id)
        .fetch_optional(pool)
        .await
}
