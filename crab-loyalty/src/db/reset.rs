//! Restaurant-wide loyalty data reset

use serde::Serialize;
use sqlx::PgConnection;

/// Rows removed by a reset
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResetCounts {
    pub points_transactions: u64,
    pub gifts: u64,
    pub visitors: u64,
}

pub async fn delete_loyalty_data(
    conn: &mut PgConnection,
    restaurant_id: i64,
) -> Result<ResetCounts, sqlx::Error> {
    let points_transactions = sqlx::query("DELETE FROM points_transactions WHERE restaurant_id = $1")
        .bind(restaurant_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    let gifts = sqlx::query("DELETE FROM gifts WHERE restaurant_id = $1")
        .bind(restaurant_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    let visitors = sqlx::query("DELETE FROM visitors WHERE restaurant_id = $1")
        .bind(restaurant_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(ResetCounts {
        points_transactions,
        gifts,
        visitors,
    })
}
