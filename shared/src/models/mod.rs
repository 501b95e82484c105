//! Data models
//!
//! Shared between the loyalty service and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes (see [`crate::util::snowflake_id`]).

pub mod loyalty;
pub mod order;
pub mod order_number;
pub mod restaurant;

// Re-exports
pub use loyalty::*;
pub use order::*;
pub use order_number::*;
pub use restaurant::*;
