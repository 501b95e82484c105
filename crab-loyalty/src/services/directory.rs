//! Restaurant directory and commission lookups

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::Restaurant;
use sqlx::PgPool;

use crate::db::restaurants;
use crate::error::ServiceResult;

fn not_found(identifier: &str) -> AppError {
    AppError::new(ErrorCode::RestaurantNotFound).with_detail("restaurant", identifier)
}

pub async fn restaurant_by_id(pool: &PgPool, id: i64) -> ServiceResult<Restaurant> {
    restaurants::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found(&id.to_string()).into())
}

pub async fn restaurant_by_name(pool: &PgPool, name: &str) -> ServiceResult<Restaurant> {
    restaurants::find_by_name(pool, name)
        .await?
        .ok_or_else(|| not_found(name).into())
}

/// Resolve a numeric id or, failing that, a restaurant name
pub async fn resolve(pool: &PgPool, identifier: &str) -> ServiceResult<Restaurant> {
    let identifier = identifier.trim();
    if let Ok(id) = identifier.parse::<i64>()
        && let Some(restaurant) = restaurants::find_by_id(pool, id).await?
    {
        return Ok(restaurant);
    }
    restaurant_by_name(pool, identifier).await
}

/// Platform commission rate, falling back to the configured default
pub async fn commission_rate(pool: &PgPool, default_rate: Decimal) -> ServiceResult<Decimal> {
    Ok(restaurants::commission_rate(pool).await?.unwrap_or(default_rate))
}

/// Commission on an order total, rounded to cents
pub fn commission_amount(total_price: Decimal, rate: Decimal) -> Decimal {
    (total_price * rate).round_dp(2)
}
