//! Payment initiation via the Stripe REST API (no SDK dependency)
//!
//! Only called after an order has committed. Failures never touch the order.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Hosted checkout created for an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub reference: String,
    pub url: String,
}

/// Order data a checkout needs
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub order_id: i64,
    pub order_number: i64,
    pub restaurant_name: &'a str,
    pub amount: Decimal,
}

/// External payment-initiation service
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// `Ok(None)` when checkout is not configured
    async fn create_checkout(&self, req: &CheckoutRequest<'_>) -> Result<Option<Checkout>, BoxError>;
}

/// Amount in euro cents, rounded half-up
pub fn to_cents(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|c| *c > 0)
}

/// Stripe Checkout Session (payment mode)
pub struct StripeCheckout {
    client: reqwest::Client,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

impl StripeCheckout {
    pub fn new(secret_key: String, success_url: String, cancel_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            success_url,
            cancel_url,
        }
    }
}

#[async_trait]
impl CheckoutProvider for StripeCheckout {
    async fn create_checkout(&self, req: &CheckoutRequest<'_>) -> Result<Option<Checkout>, BoxError> {
        let cents = to_cents(req.amount).ok_or("Order amount is not chargeable")?;
        let order_id = req.order_id.to_string();
        let product_name = format!("{} #{}", req.restaurant_name, req.order_number);
        let unit_amount = cents.to_string();

        let resp: serde_json::Value = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", "payment"),
                ("line_items[0][price_data][currency]", "eur"),
                ("line_items[0][price_data][product_data][name]", product_name.as_str()),
                ("line_items[0][price_data][unit_amount]", unit_amount.as_str()),
                ("line_items[0][quantity]", "1"),
                ("success_url", self.success_url.as_str()),
                ("cancel_url", self.cancel_url.as_str()),
                ("client_reference_id", order_id.as_str()),
                ("metadata[order_id]", order_id.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        match (resp["id"].as_str(), resp["url"].as_str()) {
            (Some(id), Some(url)) => Ok(Some(Checkout {
                reference: id.to_string(),
                url: url.to_string(),
            })),
            _ => Err(format!("Stripe create_checkout failed: {resp}").into()),
        }
    }
}

/// Used when no payment provider is configured
pub struct DisabledCheckout;

#[async_trait]
impl CheckoutProvider for DisabledCheckout {
    async fn create_checkout(&self, _req: &CheckoutRequest<'_>) -> Result<Option<Checkout>, BoxError> {
        Ok(None)
    }
}
