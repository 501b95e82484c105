//! Order Model
//!
//! Only the subset of the order record the loyalty engine writes or reads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_status", rename_all = "snake_case"))]
pub enum OrderStatus {
    Pending,
    PendingCash,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses counted as "in progress" spending by the loyalty projection
    pub const ACTIVE: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

/// How the order is served
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_type", rename_all = "snake_case"))]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
}

/// Payment method chosen at submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "payment_method", rename_all = "snake_case"))]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    /// Card payments go through the hosted checkout after the order commits
    pub fn requires_checkout(&self) -> bool {
        matches!(self, PaymentMethod::Card)
    }

    /// Status a freshly submitted order starts in
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            PaymentMethod::Cash => OrderStatus::PendingCash,
            PaymentMethod::Card => OrderStatus::Pending,
        }
    }
}

/// Order line item as submitted by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Option<i64>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Order row (loyalty-relevant columns)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub restaurant_id: i64,
    pub order_number: i64,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub commission_amount: Decimal,
    pub session_id: Option<String>,
    pub loyalty_id: Option<String>,
    pub customer_account_id: Option<String>,
    pub loyalty_gift_id: Option<i64>,
    pub loyalty_discount_amount: Option<Decimal>,
    pub loyalty_discount_percentage: Option<Decimal>,
    pub idempotency_key: Option<String>,
    pub checkout_reference: Option<String>,
    pub checkout_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Successful submission result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmitted {
    pub order_id: i64,
    pub order_number: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}
