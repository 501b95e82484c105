//! Application state for crab-loyalty

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{Config, LoyaltySettings};
use crate::stripe::{CheckoutProvider, DisabledCheckout, StripeCheckout};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Session timeout and commission fallback
    pub settings: LoyaltySettings,
    /// Post-commit payment initiation
    pub checkout: Arc<dyn CheckoutProvider>,
    /// JWT secret for account authentication
    pub jwt_secret: String,
}

impl AppState {
    /// Connect the database and build the payment collaborator
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = crate::db::connect(config).await?;
        if config.auto_migrate {
            crate::db::run_migrations(&pool).await?;
        }

        let checkout: Arc<dyn CheckoutProvider> = match &config.stripe_secret_key {
            Some(key) => Arc::new(StripeCheckout::new(
                key.clone(),
                config.checkout_success_url.clone(),
                config.checkout_cancel_url.clone(),
            )),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY not set, card orders get no checkout link");
                Arc::new(DisabledCheckout)
            }
        };

        Ok(Self::from_parts(
            pool,
            config.loyalty_settings(),
            checkout,
            config.jwt_secret.clone(),
        ))
    }

    pub fn from_parts(
        pool: PgPool,
        settings: LoyaltySettings,
        checkout: Arc<dyn CheckoutProvider>,
        jwt_secret: String,
    ) -> Self {
        Self {
            pool,
            settings,
            checkout,
            jwt_secret,
        }
    }
}
