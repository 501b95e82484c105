//! Loyalty endpoints: status, gift conversion and revert, points

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use shared::models::{LoyaltyStatus, PointsTransaction};

use crate::auth::Identity;
use crate::services::ledger::{self, Converted, Earned, GiftRef, Redeemed};
use crate::services::projector;
use crate::state::AppState;

use super::extract::{AppJson, AppQuery};
use super::{ApiResult, device_or_identity};

/// GET /loyalty-status?device=&restaurant=
#[derive(Deserialize)]
pub struct StatusQuery {
    pub device: Option<String>,
    pub restaurant: Option<String>,
}

pub async fn status(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    AppQuery(query): AppQuery<StatusQuery>,
) -> ApiResult<LoyaltyStatus> {
    let restaurant = query
        .restaurant
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::required("restaurant"))?;
    let device = device_or_identity(query.device, identity.as_ref())
        .map_err(|_| AppError::required("device"))?;

    let status =
        projector::loyalty_status(&state.pool, &state.settings, &restaurant, &device).await?;
    Ok(Json(status))
}

/// Body shared by the gift endpoints
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftRequest {
    pub gift_id: Option<i64>,
    pub device_id: Option<String>,
    pub restaurant_id: Option<i64>,
}

impl GiftRequest {
    fn resolve(self, identity: Option<&Identity>) -> Result<(i64, String, i64), AppError> {
        let gift_id = self.gift_id.ok_or_else(|| AppError::required("giftId"))?;
        let restaurant_id = self
            .restaurant_id
            .ok_or_else(|| AppError::required("restaurantId"))?;
        let device_id = device_or_identity(self.device_id, identity)?;
        Ok((gift_id, device_id, restaurant_id))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertResponse {
    pub reverted_points: i64,
}

/// POST /loyalty/revert-gift
pub async fn revert_gift(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    AppJson(req): AppJson<GiftRequest>,
) -> ApiResult<RevertResponse> {
    let (gift_id, device_id, restaurant_id) = req.resolve(identity.as_ref())?;
    let reverted_points = ledger::revert_conversion(
        &state.pool,
        GiftRef {
            gift_id,
            device_id: &device_id,
            restaurant_id,
        },
    )
    .await?;
    Ok(Json(RevertResponse { reverted_points }))
}

/// POST /loyalty/convert-gift
pub async fn convert_gift(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    AppJson(req): AppJson<GiftRequest>,
) -> ApiResult<Converted> {
    let (gift_id, device_id, restaurant_id) = req.resolve(identity.as_ref())?;
    let converted = ledger::convert_gift(
        &state.pool,
        GiftRef {
            gift_id,
            device_id: &device_id,
            restaurant_id,
        },
    )
    .await?;
    Ok(Json(converted))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub device_id: Option<String>,
    pub restaurant_id: Option<i64>,
    pub amount: Option<i64>,
}

/// POST /loyalty/redeem-points
pub async fn redeem_points(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    AppJson(req): AppJson<RedeemRequest>,
) -> ApiResult<Redeemed> {
    let restaurant_id = req
        .restaurant_id
        .ok_or_else(|| AppError::required("restaurantId"))?;
    let amount = req.amount.ok_or_else(|| AppError::required("amount"))?;
    let device_id = device_or_identity(req.device_id, identity.as_ref())?;

    let redeemed = ledger::redeem_points(&state.pool, restaurant_id, &device_id, amount).await?;
    Ok(Json(redeemed))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnRequest {
    pub order_id: Option<i64>,
}

/// POST /loyalty/earn (authenticated accounts only)
pub async fn earn(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    AppJson(req): AppJson<EarnRequest>,
) -> ApiResult<Earned> {
    if identity.as_ref().and_then(|i| i.account_id()).is_none() {
        return Err(AppError::not_authenticated());
    }
    let order_id = req.order_id.ok_or_else(|| AppError::required("orderId"))?;
    let earned = ledger::earn_points_for_order(&state.pool, order_id).await?;
    Ok(Json(earned))
}

/// GET /loyalty/transactions?device=&restaurant=&limit=
#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub device: Option<String>,
    pub restaurant: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn transactions(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    AppQuery(query): AppQuery<TransactionsQuery>,
) -> ApiResult<Vec<PointsTransaction>> {
    let restaurant_id = query
        .restaurant
        .ok_or_else(|| AppError::required("restaurant"))?;
    let device = device_or_identity(query.device, identity.as_ref())
        .map_err(|_| AppError::required("device"))?;

    let history = ledger::transactions(
        &state.pool,
        restaurant_id,
        &device,
        query.limit.unwrap_or(50),
    )
    .await?;
    Ok(Json(history))
}
