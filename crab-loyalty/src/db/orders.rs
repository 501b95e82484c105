//! Order rows written by submission and read by the status projection

use rust_decimal::Decimal;
use shared::models::{Order, OrderItem, OrderStatus, OrderType, PaymentMethod};
use sqlx::{PgConnection, PgPool};

use crate::loyalty::status::OrderHistory;

const COLUMNS: &str = "id, restaurant_id, order_number, order_type, payment_method, status, \
                       total_price, commission_amount, session_id, loyalty_id, customer_account_id, \
                       loyalty_gift_id, loyalty_discount_amount, loyalty_discount_percentage, \
                       idempotency_key, checkout_reference, checkout_url, created_at, updated_at";

/// Insert parameters for a submitted order
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub id: i64,
    pub restaurant_id: i64,
    pub order_number: i64,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub items: &'a [OrderItem],
    pub total_price: Decimal,
    pub commission_amount: Decimal,
    pub session_id: Option<&'a str>,
    pub loyalty_id: Option<&'a str>,
    pub customer_account_id: Option<&'a str>,
    pub loyalty_gift_id: Option<i64>,
    pub loyalty_discount_amount: Option<Decimal>,
    pub loyalty_discount_percentage: Option<Decimal>,
    pub idempotency_key: Option<&'a str>,
    pub now: i64,
}

pub async fn insert(conn: &mut PgConnection, order: &NewOrder<'_>) -> Result<(), sqlx::Error> {
    let items = serde_json::to_value(order.items)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query(
        "INSERT INTO orders (id, restaurant_id, order_number, order_type, payment_method, status,
                             items, total_price, commission_amount, session_id, loyalty_id,
                             customer_account_id, loyalty_gift_id, loyalty_discount_amount,
                             loyalty_discount_percentage, idempotency_key, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)",
    )
    .bind(order.id)
    .bind(order.restaurant_id)
    .bind(order.order_number)
    .bind(order.order_type)
    .bind(order.payment_method)
    .bind(order.status)
    .bind(items)
    .bind(order.total_price)
    .bind(order.commission_amount)
    .bind(order.session_id)
    .bind(order.loyalty_id)
    .bind(order.customer_account_id)
    .bind(order.loyalty_gift_id)
    .bind(order.loyalty_discount_amount)
    .bind(order.loyalty_discount_percentage)
    .bind(order.idempotency_key)
    .bind(order.now)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find(pool: &PgPool, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_idempotency_key(
    pool: &PgPool,
    restaurant_id: i64,
    key: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM orders WHERE restaurant_id = $1 AND idempotency_key = $2"
    ))
    .bind(restaurant_id)
    .bind(key)
    .fetch_optional(pool)
    .await
}

/// Record the hosted checkout on an already committed order
pub async fn set_checkout(
    pool: &PgPool,
    order_id: i64,
    reference: &str,
    url: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET checkout_reference = $2, checkout_url = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(order_id)
    .bind(reference)
    .bind(url)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Session and spending aggregates for one visitor (no locks)
pub async fn history(
    pool: &PgPool,
    restaurant_id: i64,
    device_id: &str,
) -> Result<OrderHistory, sqlx::Error> {
    let session_ids: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT session_id FROM orders
         WHERE restaurant_id = $1 AND loyalty_id = $2
           AND status <> 'cancelled' AND session_id IS NOT NULL",
    )
    .bind(restaurant_id)
    .bind(device_id)
    .fetch_all(pool)
    .await?;

    let totals: Vec<(OrderStatus, i64, Decimal)> = sqlx::query_as(
        "SELECT status, COUNT(*), COALESCE(SUM(total_price), 0) FROM orders
         WHERE restaurant_id = $1 AND loyalty_id = $2
         GROUP BY status",
    )
    .bind(restaurant_id)
    .bind(device_id)
    .fetch_all(pool)
    .await?;

    let mut history = OrderHistory {
        session_ids: session_ids.into_iter().map(|(s,)| s).collect(),
        ..OrderHistory::default()
    };
    for (status, count, spend) in totals {
        if status == OrderStatus::Completed {
            history.completed_count += count;
            history.completed_spend += spend;
        } else if status.is_active() {
            history.active_count += count;
            history.active_spend += spend;
        }
    }
    Ok(history)
}
