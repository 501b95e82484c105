//! Rewards ledger: gift lifecycle and points transactions
//!
//! Every standalone mutation runs in its own short transaction. When a gift is
//! involved its row is locked before the visitor row, on every path.

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Gift, GiftStatus, LoyaltyConfig, OrderStatus, PointsTransaction, PointsTransactionType,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::{PgConnection, PgPool};

use crate::db::{gifts, orders, points, reset, visitors};
use crate::error::ServiceResult;
use crate::loyalty::points as points_math;
use crate::services::directory;

/// A gift addressed within its owner's scope
#[derive(Debug, Clone, Copy)]
pub struct GiftRef<'a> {
    pub gift_id: i64,
    pub device_id: &'a str,
    pub restaurant_id: i64,
}

/// How many points a conversion credits
#[derive(Debug, Clone)]
pub enum ConversionAmount {
    Fixed(i64),
    /// Derived from the gift's value and the restaurant's loyalty config
    FromConfig(LoyaltyConfig),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Converted {
    pub converted_points: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Earned {
    pub earned_points: i64,
    pub total_points: i64,
    /// The order had already been credited; nothing was written
    pub already_credited: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Redeemed {
    pub redeemed_points: i64,
    pub total_points: i64,
}

fn gift_not_found(gift: &GiftRef<'_>) -> AppError {
    AppError::new(ErrorCode::GiftNotFound).with_detail("gift_id", gift.gift_id)
}

fn require_transition(gift: &Gift, next: GiftStatus) -> Result<(), AppError> {
    if gift.status.can_transition_to(next) {
        return Ok(());
    }
    Err(AppError::invalid_state(format!(
        "Gift is {}, cannot become {}",
        gift.status.as_str(),
        next.as_str()
    ))
    .with_detail("gift_id", gift.id)
    .with_detail("status", gift.status.as_str()))
}

async fn lock_gift(conn: &mut PgConnection, gift: &GiftRef<'_>) -> ServiceResult<Gift> {
    gifts::lock(conn, gift.gift_id, gift.restaurant_id, gift.device_id)
        .await?
        .ok_or_else(|| gift_not_found(gift).into())
}

/// Attach an unused gift to an order (inside the caller's transaction)
pub async fn consume_gift(
    conn: &mut PgConnection,
    gift: GiftRef<'_>,
    order_id: i64,
) -> ServiceResult<()> {
    let row = lock_gift(&mut *conn, &gift).await?;
    require_transition(&row, GiftStatus::Consumed)?;
    gifts::set_status(conn, row.id, GiftStatus::Consumed, Some(order_id)).await?;
    tracing::info!(gift_id = row.id, order_id, "Gift consumed");
    Ok(())
}

/// Exchange an unused gift for points
pub async fn convert_gift_to_points(
    pool: &PgPool,
    gift: GiftRef<'_>,
    amount: ConversionAmount,
) -> ServiceResult<Converted> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let row = lock_gift(&mut *tx, &gift).await?;
    require_transition(&row, GiftStatus::Converted)?;

    let converted_points = match &amount {
        ConversionAmount::Fixed(points) if *points > 0 => *points,
        ConversionAmount::Fixed(_) => {
            return Err(AppError::validation("pointsAmount must be positive").into());
        }
        ConversionAmount::FromConfig(config) => points_math::conversion_points(&row, config)?,
    };

    visitors::ensure(&mut *tx, gift.restaurant_id, gift.device_id, now).await?;
    let entry = PointsTransaction {
        id: snowflake_id(),
        restaurant_id: gift.restaurant_id,
        device_id: gift.device_id.to_string(),
        order_id: None,
        gift_id: Some(row.id),
        tx_type: PointsTransactionType::ConvertGift,
        amount: converted_points,
        created_at: now,
    };
    if !points::insert(&mut *tx, &entry).await? {
        return Err(AppError::invalid_state("Gift already has a conversion record")
            .with_detail("gift_id", row.id)
            .into());
    }
    let total_points =
        visitors::add_points(&mut *tx, gift.restaurant_id, gift.device_id, converted_points, now)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
    gifts::set_status(&mut *tx, row.id, GiftStatus::Converted, None).await?;

    tx.commit().await?;

    tracing::info!(
        gift_id = row.id,
        restaurant_id = gift.restaurant_id,
        points = converted_points,
        "Gift converted to points"
    );
    Ok(Converted {
        converted_points,
        total_points,
    })
}

/// Convert using the restaurant's loyalty configuration
pub async fn convert_gift(pool: &PgPool, gift: GiftRef<'_>) -> ServiceResult<Converted> {
    let restaurant = directory::restaurant_by_id(pool, gift.restaurant_id).await?;
    let config = LoyaltyConfig::from_value(&restaurant.loyalty_config);
    convert_gift_to_points(pool, gift, ConversionAmount::FromConfig(config)).await
}

/// Undo a conversion; returns the points taken back
pub async fn revert_conversion(pool: &PgPool, gift: GiftRef<'_>) -> ServiceResult<i64> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let row = lock_gift(&mut *tx, &gift).await?;
    require_transition(&row, GiftStatus::Unused)?;

    let entry = points::lock_conversion(&mut *tx, row.id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::ConversionNotFound).with_detail("gift_id", row.id)
    })?;

    let balance =
        visitors::add_points(&mut *tx, gift.restaurant_id, gift.device_id, -entry.amount, now)
            .await?;
    points::delete(&mut *tx, entry.id).await?;
    gifts::set_status(&mut *tx, row.id, GiftStatus::Unused, None).await?;

    tx.commit().await?;

    tracing::info!(
        gift_id = row.id,
        restaurant_id = gift.restaurant_id,
        points = entry.amount,
        balance = ?balance,
        "Gift conversion reverted"
    );
    Ok(entry.amount)
}

/// Credit points for a completed order (once per order)
pub async fn earn_points_for_order(pool: &PgPool, order_id: i64) -> ServiceResult<Earned> {
    let order = orders::find(pool, order_id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id)
    })?;
    if order.status != OrderStatus::Completed {
        return Err(AppError::new(ErrorCode::OrderNotCompleted)
            .with_detail("order_id", order_id)
            .into());
    }
    let device_id = order
        .loyalty_id
        .as_deref()
        .ok_or_else(|| AppError::validation("Order has no loyalty identifier"))?;

    let restaurant = directory::restaurant_by_id(pool, order.restaurant_id).await?;
    let config = LoyaltyConfig::from_value(&restaurant.loyalty_config);
    if !config.points_enabled {
        return Err(AppError::new(ErrorCode::PointsDisabled).into());
    }
    let earned = points_math::earn_points(order.total_price, &config)?;

    let now = now_millis();
    let mut tx = pool.begin().await?;
    visitors::ensure(&mut *tx, order.restaurant_id, device_id, now).await?;
    let visitor = visitors::lock(&mut *tx, order.restaurant_id, device_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    if earned == 0 {
        tx.commit().await?;
        return Ok(Earned {
            earned_points: 0,
            total_points: visitor.total_points,
            already_credited: false,
        });
    }

    let entry = PointsTransaction {
        id: snowflake_id(),
        restaurant_id: order.restaurant_id,
        device_id: device_id.to_string(),
        order_id: Some(order.id),
        gift_id: None,
        tx_type: PointsTransactionType::Earn,
        amount: earned,
        created_at: now,
    };
    if !points::insert(&mut *tx, &entry).await? {
        tx.commit().await?;
        return Ok(Earned {
            earned_points: 0,
            total_points: visitor.total_points,
            already_credited: true,
        });
    }
    let total_points = visitors::add_points(&mut *tx, order.restaurant_id, device_id, earned, now)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;

    tracing::info!(order_id, points = earned, "Points earned");
    Ok(Earned {
        earned_points: earned,
        total_points,
        already_credited: false,
    })
}

/// Spend points from a visitor's balance
pub async fn redeem_points(
    pool: &PgPool,
    restaurant_id: i64,
    device_id: &str,
    amount: i64,
) -> ServiceResult<Redeemed> {
    if amount <= 0 {
        return Err(AppError::validation("amount must be positive")
            .with_detail("field", "amount")
            .into());
    }

    let now = now_millis();
    let mut tx = pool.begin().await?;
    let visitor = visitors::lock(&mut *tx, restaurant_id, device_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::VisitorNotFound))?;

    if visitor.total_points < amount {
        return Err(AppError::new(ErrorCode::InsufficientPoints)
            .with_detail("available", visitor.total_points)
            .with_detail("requested", amount)
            .into());
    }

    let entry = PointsTransaction {
        id: snowflake_id(),
        restaurant_id,
        device_id: device_id.to_string(),
        order_id: None,
        gift_id: None,
        tx_type: PointsTransactionType::Redeem,
        amount,
        created_at: now,
    };
    points::insert(&mut *tx, &entry).await?;
    let total_points = visitors::add_points(&mut *tx, restaurant_id, device_id, -amount, now)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;

    tracing::info!(restaurant_id, points = amount, "Points redeemed");
    Ok(Redeemed {
        redeemed_points: amount,
        total_points,
    })
}

/// Ledger history, newest first
pub async fn transactions(
    pool: &PgPool,
    restaurant_id: i64,
    device_id: &str,
    limit: i64,
) -> ServiceResult<Vec<PointsTransaction>> {
    Ok(points::list(pool, restaurant_id, device_id, limit.clamp(1, 500)).await?)
}

/// Wipe a restaurant's visitors, gifts and points (owner only)
pub async fn reset_restaurant(
    pool: &PgPool,
    restaurant_id: i64,
    account_id: &str,
) -> ServiceResult<reset::ResetCounts> {
    let restaurant = directory::restaurant_by_id(pool, restaurant_id).await?;
    if restaurant.owner_account_id.as_deref() != Some(account_id) {
        return Err(AppError::permission_denied("Only the restaurant owner can reset loyalty data")
            .into());
    }

    let mut tx = pool.begin().await?;
    let counts = reset::delete_loyalty_data(&mut *tx, restaurant_id).await?;
    tx.commit().await?;

    tracing::warn!(
        restaurant_id,
        account_id,
        visitors = counts.visitors,
        gifts = counts.gifts,
        points_transactions = counts.points_transactions,
        "Restaurant loyalty data reset"
    );
    Ok(counts)
}
