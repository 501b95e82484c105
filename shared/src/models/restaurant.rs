//! Restaurant Model
//!
//! Directory entry plus the typed loyalty configuration stored alongside it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Restaurant directory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    /// Account that owns the restaurant (may reset its loyalty data)
    pub owner_account_id: Option<String>,
    /// IANA timezone used for order-number reset boundaries
    pub timezone: String,
    /// Raw loyalty configuration, parse with [`LoyaltyConfig::from_value`]
    pub loyalty_config: serde_json::Value,
    pub last_active_at: Option<i64>,
    pub created_at: i64,
}

/// Per-restaurant loyalty configuration
///
/// Missing keys fall back to defaults when the row is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LoyaltyConfig {
    pub points_enabled: bool,
    /// Points credited per euro spent or per euro of converted gift value
    pub points_per_euro: Decimal,
    /// Flat points for converting a percentage gift
    pub percentage_gift_points: i64,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            points_enabled: true,
            points_per_euro: Decimal::TEN,
            percentage_gift_points: 50,
        }
    }
}

impl LoyaltyConfig {
    /// Parse a stored JSON blob; `null` or an unreadable blob yields defaults
    pub fn from_value(value: &serde_json::Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        match serde_json::from_value(value.clone()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid loyalty config, using defaults");
                Self::default()
            }
        }
    }
}
