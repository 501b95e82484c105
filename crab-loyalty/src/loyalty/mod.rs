//! Loyalty domain logic (pure, no I/O)
//!
//! - `order_number`: reset-epoch aware counter arithmetic
//! - `session`: visit session transitions and lazy expiry
//! - `points`: earn and gift-conversion amounts
//! - `status`: read-side status projection

pub mod order_number;
pub mod points;
pub mod session;
pub mod status;
