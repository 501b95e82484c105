//! Order submission
//!
//! The only multi-entity write path. Session, order number, order row and gift
//! consumption commit together or not at all; payment initiation follows the
//! commit and can only degrade the response.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{OrderItem, OrderSubmitted, OrderType, PaymentMethod, Restaurant};
use shared::util::snowflake_id;
use sqlx::PgPool;

use crate::auth::Identity;
use crate::config::LoyaltySettings;
use crate::db::{gifts, orders};
use crate::error::{ServiceError, ServiceResult, is_unique_violation};
use crate::services::{allocator, directory, ledger, session_tracker};
use crate::stripe::{CheckoutProvider, CheckoutRequest};

/// Submission request body; every field is checked by [`SubmitOrder::validate`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrder {
    pub restaurant_name: Option<String>,
    pub order_type: Option<OrderType>,
    pub items: Option<Vec<OrderItem>>,
    pub total_price: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub loyalty_device_id: Option<String>,
    pub loyalty_gift_id: Option<i64>,
    pub loyalty_discount_amount: Option<Decimal>,
    pub loyalty_discount_percentage: Option<Decimal>,
    pub idempotency_key: Option<String>,
}

/// A request that passed validation
#[derive(Debug, Clone)]
pub struct ValidOrder {
    pub restaurant_name: String,
    pub order_type: OrderType,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
    pub payment_method: PaymentMethod,
    pub device_id: Option<String>,
    pub account_id: Option<String>,
    pub gift_id: Option<i64>,
    pub discount_amount: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub idempotency_key: Option<String>,
}

/// Largest amount the order columns hold (NUMERIC(10, 2))
fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

fn check_amount(field: &str, value: Decimal) -> Result<(), AppError> {
    if value < Decimal::ZERO || value > max_amount() {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("{field} must be between 0 and {}", max_amount()),
        )
        .with_detail("field", field));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl SubmitOrder {
    /// Check required fields and shape; the caller's identity fills in the
    /// device id when the body omits it
    pub fn validate(self, identity: Option<&Identity>) -> Result<ValidOrder, AppError> {
        let restaurant_name =
            non_blank(self.restaurant_name).ok_or_else(|| AppError::required("restaurantName"))?;
        let order_type = self.order_type.ok_or_else(|| AppError::required("orderType"))?;
        let payment_method = self
            .payment_method
            .ok_or_else(|| AppError::required("paymentMethod"))?;
        let items = self.items.ok_or_else(|| AppError::required("items"))?;
        let total_price = self.total_price.ok_or_else(|| AppError::required("totalPrice"))?;

        if items.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }
        if let Some(bad) = items
            .iter()
            .position(|i| i.quantity <= 0 || i.unit_price < Decimal::ZERO)
        {
            return Err(AppError::validation("Item quantity and price must be positive")
                .with_detail("item", bad));
        }
        if let Some(bad) = items.iter().position(|i| i.unit_price > max_amount()) {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("unitPrice must not exceed {}", max_amount()),
            )
            .with_detail("item", bad));
        }
        check_amount("totalPrice", total_price)?;
        if let Some(amount) = self.loyalty_discount_amount {
            check_amount("loyaltyDiscountAmount", amount)?;
        }
        if let Some(pct) = self.loyalty_discount_percentage
            && (pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED)
        {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "loyaltyDiscountPercentage must be between 0 and 100",
            )
            .with_detail("field", "loyaltyDiscountPercentage"));
        }

        let device_id = non_blank(self.loyalty_device_id)
            .or_else(|| identity.and_then(|i| i.device_id()).map(str::to_string));
        if self.loyalty_gift_id.is_some() && device_id.is_none() {
            return Err(AppError::required("loyaltyDeviceId"));
        }

        Ok(ValidOrder {
            restaurant_name,
            order_type,
            items,
            total_price,
            payment_method,
            device_id,
            account_id: identity.and_then(|i| i.account_id()).map(str::to_string),
            gift_id: self.loyalty_gift_id,
            discount_amount: self.loyalty_discount_amount,
            discount_percentage: self.loyalty_discount_percentage,
            idempotency_key: non_blank(self.idempotency_key),
        })
    }
}

/// Submission result; `replayed` is set when an idempotency key matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub order: OrderSubmitted,
    pub replayed: bool,
}

async fn replay(pool: &PgPool, restaurant_id: i64, key: &str) -> ServiceResult<Option<Submission>> {
    Ok(orders::find_by_idempotency_key(pool, restaurant_id, key)
        .await?
        .map(|o| Submission {
            order: OrderSubmitted {
                order_id: o.id,
                order_number: o.order_number,
                checkout_url: o.checkout_url,
            },
            replayed: true,
        }))
}

/// Submit an order
pub async fn submit(
    pool: &PgPool,
    settings: &LoyaltySettings,
    checkout: &dyn CheckoutProvider,
    order: ValidOrder,
) -> ServiceResult<Submission> {
    let restaurant = directory::restaurant_by_name(pool, &order.restaurant_name).await?;

    if let Some(key) = order.idempotency_key.as_deref()
        && let Some(previous) = replay(pool, restaurant.id, key).await?
    {
        tracing::info!(order_id = previous.order.order_id, "Idempotent submission replayed");
        return Ok(previous);
    }

    let rate = directory::commission_rate(pool, settings.default_commission_rate).await?;
    let commission = directory::commission_amount(order.total_price, rate);

    let (order_id, order_number) =
        match write_order(pool, settings, &restaurant, &order, commission).await {
            Ok(written) => written,
            Err(e) if e.code() == Some(ErrorCode::AlreadyExists) => {
                if let Some(key) = order.idempotency_key.as_deref()
                    && let Some(previous) = replay(pool, restaurant.id, key).await?
                {
                    tracing::info!(
                        order_id = previous.order.order_id,
                        "Concurrent duplicate submission resolved"
                    );
                    return Ok(previous);
                }
                return Err(submission_failed(e));
            }
            Err(e) if e.code() == Some(ErrorCode::StoreConflict) => return Err(e),
            Err(e) => return Err(submission_failed(e)),
        };

    tracing::info!(
        order_id,
        order_number,
        restaurant_id = restaurant.id,
        payment_method = ?order.payment_method,
        "Order submitted"
    );

    let checkout_url = if order.payment_method.requires_checkout() {
        start_checkout(pool, checkout, &restaurant, order_id, order_number, order.total_price).await
    } else {
        None
    };

    Ok(Submission {
        order: OrderSubmitted {
            order_id,
            order_number,
            checkout_url,
        },
        replayed: false,
    })
}

fn submission_failed(e: ServiceError) -> ServiceError {
    let detail = match &e {
        ServiceError::App(app) => format!("{} ({})", app.message, app.code),
        ServiceError::Db(db) => db.to_string(),
    };
    tracing::error!(error = %detail, "Order submission rolled back");
    AppError::new(ErrorCode::OrderSubmissionFailed).into()
}

/// The transactional part: session, number, order row, gift
async fn write_order(
    pool: &PgPool,
    settings: &LoyaltySettings,
    restaurant: &Restaurant,
    order: &ValidOrder,
    commission: Decimal,
) -> ServiceResult<(i64, i64)> {
    let now = Utc::now();
    let now_ms = now.timestamp_millis();
    let order_id = snowflake_id();
    let mut tx = pool.begin().await?;

    let gift = match (order.gift_id, order.device_id.as_deref()) {
        (Some(gift_id), Some(device_id)) => Some(ledger::GiftRef {
            gift_id,
            device_id,
            restaurant_id: restaurant.id,
        }),
        _ => None,
    };
    // gift row before visitor row, matching the ledger's lock order
    if let Some(gift) = &gift {
        gifts::lock(&mut *tx, gift.gift_id, gift.restaurant_id, gift.device_id).await?;
    }

    let session_id = match order.device_id.as_deref() {
        Some(device_id) => session_tracker::touch(
            &mut *tx,
            restaurant.id,
            device_id,
            now_ms,
            settings.session_idle_timeout_ms,
        )
        .await?
        .current_session_id,
        None => None,
    };

    let order_number =
        allocator::next_order_number(&mut *tx, restaurant.id, &restaurant.timezone, now).await?;

    let row = orders::NewOrder {
        id: order_id,
        restaurant_id: restaurant.id,
        order_number,
        order_type: order.order_type,
        payment_method: order.payment_method,
        status: order.payment_method.initial_status(),
        items: &order.items,
        total_price: order.total_price,
        commission_amount: commission,
        session_id: session_id.as_deref(),
        loyalty_id: order.device_id.as_deref(),
        customer_account_id: order.account_id.as_deref(),
        loyalty_gift_id: order.gift_id,
        loyalty_discount_amount: order.discount_amount,
        loyalty_discount_percentage: order.discount_percentage,
        idempotency_key: order.idempotency_key.as_deref(),
        now: now_ms,
    };
    orders::insert(&mut *tx, &row).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::new(ErrorCode::AlreadyExists).into()
        } else {
            ServiceError::from(e)
        }
    })?;

    if let Some(gift) = gift {
        ledger::consume_gift(&mut *tx, gift, order_id).await?;
    }

    tx.commit().await?;
    Ok((order_id, order_number))
}

/// Best-effort hosted checkout after commit
async fn start_checkout(
    pool: &PgPool,
    checkout: &dyn CheckoutProvider,
    restaurant: &Restaurant,
    order_id: i64,
    order_number: i64,
    amount: Decimal,
) -> Option<String> {
    let req = CheckoutRequest {
        order_id,
        order_number,
        restaurant_name: &restaurant.name,
        amount,
    };
    let session = match checkout.create_checkout(&req).await {
        Ok(Some(session)) => session,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(order_id, error = %e, "Checkout initiation failed, order kept");
            return None;
        }
    };

    if let Err(e) = orders::set_checkout(
        pool,
        order_id,
        &session.reference,
        &session.url,
        shared::util::now_millis(),
    )
    .await
    {
        tracing::warn!(order_id, error = %e, "Failed to record checkout reference");
    }
    Some(session.url)
}
