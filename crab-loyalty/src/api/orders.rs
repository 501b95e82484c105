//! Order submission endpoint

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use shared::error::AppError;
use shared::models::OrderSubmitted;

use crate::auth::Identity;
use crate::services::submission::{self, SubmitOrder};
use crate::state::AppState;

use super::extract::AppJson;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// POST /orders
///
/// 201 for a new order, 200 when an idempotency key replays an earlier one.
pub async fn submit(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    headers: HeaderMap,
    AppJson(mut req): AppJson<SubmitOrder>,
) -> Result<(StatusCode, Json<OrderSubmitted>), AppError> {
    if req.idempotency_key.is_none() {
        req.idempotency_key = headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }

    let order = req.validate(identity.as_ref())?;
    let result = submission::submit(
        &state.pool,
        &state.settings,
        state.checkout.as_ref(),
        order,
    )
    .await?;

    let status = if result.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(result.order)))
}
