//! Points ledger rows

use shared::models::{PointsTransaction, PointsTransactionType};
use sqlx::{PgConnection, PgPool};

const COLUMNS: &str = "id, restaurant_id, device_id, order_id, gift_id, tx_type, amount, created_at";

/// Append a ledger entry; returns `false` when the order/gift already has one
pub async fn insert(conn: &mut PgConnection, tx: &PointsTransaction) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "INSERT INTO points_transactions ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT DO NOTHING"
    ))
    .bind(tx.id)
    .bind(tx.restaurant_id)
    .bind(&tx.device_id)
    .bind(tx.order_id)
    .bind(tx.gift_id)
    .bind(tx.tx_type)
    .bind(tx.amount)
    .bind(tx.created_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// The CONVERT_GIFT entry of a gift, locked
pub async fn lock_conversion(
    conn: &mut PgConnection,
    gift_id: i64,
) -> Result<Option<PointsTransaction>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM points_transactions
         WHERE gift_id = $1 AND tx_type = $2
         FOR UPDATE"
    ))
    .bind(gift_id)
    .bind(PointsTransactionType::ConvertGift)
    .fetch_optional(conn)
    .await
}

pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM points_transactions WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Ledger history of a visitor, newest first
pub async fn list(
    pool: &PgPool,
    restaurant_id: i64,
    device_id: &str,
    limit: i64,
) -> Result<Vec<PointsTransaction>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM points_transactions
         WHERE restaurant_id = $1 AND device_id = $2
         ORDER BY created_at DESC, id DESC
         LIMIT $3"
    ))
    .bind(restaurant_id)
    .bind(device_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
