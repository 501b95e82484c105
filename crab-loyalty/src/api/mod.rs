//! API routes for crab-loyalty

pub mod extract;
pub mod health;
pub mod loyalty;
pub mod orders;
pub mod restaurants;

use axum::routing::{delete, get, post};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::{Identity, identity_middleware};
use crate::state::AppState;

pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Device id from the request, falling back to the anonymous identity
pub(crate) fn device_or_identity(
    explicit: Option<String>,
    identity: Option<&Identity>,
) -> Result<String, AppError> {
    explicit
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| identity.and_then(|i| i.device_id()).map(str::to_string))
        .ok_or_else(|| AppError::required("deviceId"))
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/loyalty-status", get(loyalty::status))
        .route("/orders", post(orders::submit))
        .route("/loyalty/revert-gift", post(loyalty::revert_gift))
        .route("/loyalty/convert-gift", post(loyalty::convert_gift))
        .route("/loyalty/redeem-points", post(loyalty::redeem_points))
        .route("/loyalty/earn", post(loyalty::earn))
        .route("/loyalty/transactions", get(loyalty::transactions))
        .route("/restaurants/{id}/loyalty", delete(restaurants::reset_loyalty))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
