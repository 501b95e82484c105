//! Shared types for the Crab loyalty platform
//!
//! Error codes, the API error envelope, loyalty/order models and small
//! utilities used by the service crate and its clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
