//! Order number allocation under the counter row lock

use chrono::{DateTime, Utc};
use shared::error::AppError;
use sqlx::PgConnection;

use crate::db::order_numbers;
use crate::error::ServiceResult;
use crate::loyalty::order_number;

/// Next order number for a restaurant
///
/// Locks the restaurant's counter row; concurrent submissions for the same
/// restaurant serialize here until the enclosing transaction ends.
pub async fn next_order_number(
    conn: &mut PgConnection,
    restaurant_id: i64,
    timezone: &str,
    now: DateTime<Utc>,
) -> ServiceResult<i64> {
    let config = order_numbers::lock_or_create(&mut *conn, restaurant_id).await?;

    let today = match order_number::business_date(now, timezone) {
        Ok(date) => date,
        Err(e) => {
            tracing::warn!(restaurant_id, error = %e, "Falling back to UTC business date");
            now.date_naive()
        }
    };

    let allocation = order_number::allocate(&config, today).map_err(AppError::from)?;
    order_numbers::save(conn, &allocation.config).await?;

    if allocation.reset {
        tracing::info!(
            restaurant_id,
            period = ?config.reset_period,
            "Order numbers reset for new epoch"
        );
    }
    Ok(allocation.order_number)
}
