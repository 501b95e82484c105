//! Points arithmetic

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use shared::error::{AppError, ErrorCode};
use shared::models::{Gift, GiftType, LoyaltyConfig};

/// `floor(value × rate)`, or `None` when the product leaves the `i64` range
fn floor_points(value: Decimal, rate: Decimal) -> Option<i64> {
    value.checked_mul(rate)?.floor().to_i64()
}

/// Points credited for a completed order total
pub fn earn_points(total_price: Decimal, config: &LoyaltyConfig) -> Result<i64, AppError> {
    if total_price <= Decimal::ZERO || config.points_per_euro <= Decimal::ZERO {
        return Ok(0);
    }
    floor_points(total_price, config.points_per_euro).ok_or_else(|| {
        AppError::with_message(
            ErrorCode::ValueOutOfRange,
            "Earned points exceed the supported range",
        )
        .with_detail("pointsPerEuro", config.points_per_euro.to_string())
    })
}

/// Points a gift is worth when exchanged
///
/// Fixed-value gifts convert at `points_per_euro`, percentage gifts at the
/// configured flat amount. A gift worth nothing cannot be converted.
pub fn conversion_points(gift: &Gift, config: &LoyaltyConfig) -> Result<i64, AppError> {
    let points = match gift.gift_type {
        GiftType::FixedValue => gift
            .euro_value
            .filter(|v| *v > Decimal::ZERO)
            .and_then(|v| floor_points(v, config.points_per_euro))
            .unwrap_or(0),
        GiftType::Percentage => {
            if gift.percentage_value.is_some_and(|p| p > Decimal::ZERO) {
                config.percentage_gift_points
            } else {
                0
            }
        }
    };

    if points <= 0 {
        return Err(
            AppError::new(ErrorCode::GiftNotConvertible).with_detail("gift_id", gift.id),
        );
    }
    Ok(points)
}
