//! HTTP handlers for relay-service.

pub mod health;
pub mod send;

pub use health::{health_check, metrics_endpoint, not_found};
pub use send::{send_message, SendResponse};
