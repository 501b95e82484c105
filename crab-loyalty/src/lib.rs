//! crab-loyalty library
//!
//! Layering: `api` → `services` → `db`, with pure rules in `loyalty`.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod loyalty;
pub mod services;
pub mod state;
pub mod stripe;
