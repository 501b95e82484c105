//! Loyalty services
//!
//! Each service owns its transaction boundaries; `session_tracker`,
//! `allocator` and `ledger::consume_gift` also run inside the submission
//! transaction.

pub mod allocator;
pub mod directory;
pub mod ledger;
pub mod projector;
pub mod session_tracker;
pub mod submission;
