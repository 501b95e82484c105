//! Loyalty status read path (no locks, no writes)

use shared::models::{LoyaltyConfig, LoyaltyStatus};
use shared::util::now_millis;
use sqlx::PgPool;

use crate::config::LoyaltySettings;
use crate::db::{gifts, orders, visitors};
use crate::error::ServiceResult;
use crate::loyalty::status;
use crate::services::directory;

/// Status snapshot for a device at a restaurant (id or name)
pub async fn loyalty_status(
    pool: &PgPool,
    settings: &LoyaltySettings,
    restaurant: &str,
    device_id: &str,
) -> ServiceResult<LoyaltyStatus> {
    let restaurant = directory::resolve(pool, restaurant).await?;
    let config = LoyaltyConfig::from_value(&restaurant.loyalty_config);

    let visitor = visitors::find(pool, restaurant.id, device_id).await?;
    let gifts = gifts::list_visible(pool, restaurant.id, device_id).await?;
    let history = orders::history(pool, restaurant.id, device_id).await?;

    Ok(status::project(
        visitor.as_ref(),
        gifts,
        &history,
        &config,
        now_millis(),
        settings.session_idle_timeout_ms,
    ))
}
