//! Order Number Configuration Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// When a restaurant's order counter starts over
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "reset_period", rename_all = "lowercase"))]
pub enum ResetPeriod {
    #[default]
    Never,
    Daily,
    Weekly,
    Monthly,
}

/// Per-restaurant order number counter (one row per restaurant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderNumberConfig {
    pub restaurant_id: i64,
    pub starting_number: i64,
    /// Next number to hand out within the current epoch
    pub current_number: i64,
    pub reset_period: ResetPeriod,
    /// 0 = Sunday … 6 = Saturday
    pub weekly_start_day: i16,
    pub last_reset_date: Option<NaiveDate>,
}

impl OrderNumberConfig {
    /// Fresh counter for a restaurant that never allocated a number
    pub fn new(restaurant_id: i64) -> Self {
        Self {
            restaurant_id,
            starting_number: 1,
            current_number: 1,
            reset_period: ResetPeriod::Never,
            weekly_start_day: 1,
            last_reset_date: None,
        }
    }
}
