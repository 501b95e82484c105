//! Loyalty Models
//!
//! Visitors, gifts and the points ledger, plus the read-side status snapshot
//! served to ordering clients.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Loyalty identity of one device at one restaurant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Visitor {
    pub restaurant_id: i64,
    pub device_id: String,
    pub total_points: i64,
    pub orders_in_current_session: i32,
    /// Unix millis of the last order placed by this visitor
    pub last_visit_at: i64,
    pub current_session_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Gift type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "gift_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum GiftType {
    FixedValue,
    Percentage,
}

/// Gift lifecycle status
///
/// `unused → consumed`, `unused → converted`, `converted → unused`.
/// `consumed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "gift_status", rename_all = "lowercase"))]
pub enum GiftStatus {
    Unused,
    Consumed,
    Converted,
}

impl GiftStatus {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: GiftStatus) -> bool {
        matches!(
            (self, next),
            (GiftStatus::Unused, GiftStatus::Consumed)
                | (GiftStatus::Unused, GiftStatus::Converted)
                | (GiftStatus::Converted, GiftStatus::Unused)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GiftStatus::Unused => "unused",
            GiftStatus::Consumed => "consumed",
            GiftStatus::Converted => "converted",
        }
    }
}

/// Gift entity (redeemable reward unit)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Gift {
    pub id: i64,
    pub restaurant_id: i64,
    pub device_id: String,
    #[serde(rename = "type")]
    pub gift_type: GiftType,
    pub euro_value: Option<Decimal>,
    pub percentage_value: Option<Decimal>,
    pub status: GiftStatus,
    pub order_id: Option<i64>,
    pub created_at: i64,
}

/// Points ledger entry type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "points_transaction_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PointsTransactionType {
    Earn,
    Redeem,
    ConvertGift,
}

/// Points ledger entry
///
/// `amount` is always positive; the type tells the direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PointsTransaction {
    pub id: i64,
    pub restaurant_id: i64,
    pub device_id: String,
    pub order_id: Option<i64>,
    pub gift_id: Option<i64>,
    #[serde(rename = "type")]
    pub tx_type: PointsTransactionType,
    pub amount: i64,
    pub created_at: i64,
}

/// Derived label summarizing a visitor's loyalty standing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiState {
    Welcome,
    GiftAvailable,
    PointsProgress,
    ActiveEarning,
}

/// Eligibility flags of the status snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyEligibility {
    pub can_earn_points: bool,
    pub can_receive_gift: bool,
    pub can_convert_gift: bool,
}

/// Loyalty status snapshot (read-only projection)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyStatus {
    pub total_points: i64,
    pub total_visits: i64,
    pub orders_in_current_visit: i32,
    pub active_gifts: Vec<Gift>,
    pub converted_gifts: Vec<Gift>,
    pub completed_orders: i64,
    pub active_orders: i64,
    pub total_spending: Decimal,
    pub total_potential_spending: Decimal,
    pub ui_state: UiState,
    pub eligibility: LoyaltyEligibility,
}
