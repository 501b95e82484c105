//! Restaurant administration endpoints

use axum::{Extension, Json, extract::State};
use shared::error::AppError;

use crate::auth::Identity;
use crate::db::reset::ResetCounts;
use crate::services::ledger;
use crate::state::AppState;

use super::ApiResult;
use super::extract::AppPath;

/// DELETE /restaurants/{id}/loyalty
pub async fn reset_loyalty(
    State(state): State<AppState>,
    Extension(identity): Extension<Option<Identity>>,
    AppPath(restaurant_id): AppPath<i64>,
) -> ApiResult<ResetCounts> {
    let account_id = identity
        .as_ref()
        .and_then(|i| i.account_id())
        .ok_or_else(AppError::not_authenticated)?;

    let counts = ledger::reset_restaurant(&state.pool, restaurant_id, account_id).await?;
    Ok(Json(counts))
}
