//! Loyalty service configuration

use rust_decimal::Decimal;
use std::str::FromStr;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Idle gap that closes a visit session
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 60;

/// Loyalty service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Log output: `text` (default) or `json`
    pub log_format: String,
    /// HS256 secret used to verify account bearer tokens
    pub jwt_secret: String,
    /// Stripe secret key (checkout disabled when absent)
    pub stripe_secret_key: Option<String>,
    /// URL the hosted checkout redirects to after payment
    pub checkout_success_url: String,
    /// URL the hosted checkout redirects to when the customer aborts
    pub checkout_cancel_url: String,
    /// Commission rate used when the platform settings row has none
    pub default_commission_rate: Decimal,
    /// Idle gap (seconds) after which the next order opens a new session
    pub session_idle_timeout_secs: u64,
    /// Max pooled connections
    pub db_max_connections: u32,
    /// `lock_timeout` applied to every pooled connection
    pub db_lock_timeout_ms: u64,
    /// `statement_timeout` applied to every pooled connection
    pub db_statement_timeout_ms: u64,
    /// Apply pending migrations at startup
    pub auto_migrate: bool,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn parse_or<T: FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_dev = environment == "development";

        let default_commission_rate: Decimal =
            Self::parse_or("DEFAULT_COMMISSION_RATE", Decimal::ZERO);
        if default_commission_rate < Decimal::ZERO || default_commission_rate > Decimal::ONE {
            return Err("DEFAULT_COMMISSION_RATE must be between 0 and 1".into());
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: Self::parse_or("HTTP_PORT", 8080),
            environment: environment.clone(),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            checkout_success_url: std::env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| "https://redcoral.app/order/success".into()),
            checkout_cancel_url: std::env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "https://redcoral.app/order/cancel".into()),
            default_commission_rate,
            session_idle_timeout_secs: Self::parse_or(
                "SESSION_IDLE_TIMEOUT_SECS",
                DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
            ),
            db_max_connections: Self::parse_or("DB_MAX_CONNECTIONS", 10),
            db_lock_timeout_ms: Self::parse_or("DB_LOCK_TIMEOUT_MS", 5_000),
            db_statement_timeout_ms: Self::parse_or("DB_STATEMENT_TIMEOUT_MS", 15_000),
            auto_migrate: Self::parse_or("AUTO_MIGRATE", is_dev),
        })
    }

    /// Settings the loyalty services read on every request
    pub fn loyalty_settings(&self) -> LoyaltySettings {
        LoyaltySettings {
            session_idle_timeout_ms: (self.session_idle_timeout_secs * 1000) as i64,
            default_commission_rate: self.default_commission_rate,
        }
    }
}

/// Request-path settings derived from [`Config`]
#[derive(Debug, Clone, Copy)]
pub struct LoyaltySettings {
    pub session_idle_timeout_ms: i64,
    pub default_commission_rate: Decimal,
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        Self {
            session_idle_timeout_ms: (DEFAULT_SESSION_IDLE_TIMEOUT_SECS * 1000) as i64,
            default_commission_rate: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_use_sixty_second_sessions() {
        let settings = LoyaltySettings::default();
        assert_eq!(settings.session_idle_timeout_ms, 60_000);
        assert_eq!(settings.default_commission_rate, Decimal::ZERO);
    }

    #[test]
    fn test_parse_or_falls_back_on_missing_var() {
        let port: u16 = Config::parse_or("CRAB_LOYALTY_TEST_UNSET_PORT", 8080);
        assert_eq!(port, 8080);
    }
}
