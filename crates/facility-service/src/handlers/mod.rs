//! HTTP request handlers for the facility service.

pub mod access;
pub mod bookings;
pub mod health;
pub mod metrics;
pub mod relay;

pub use access::{access_logs, active_booking, verify};
pub use bookings::{create_booking, delete_booking, list_bookings};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use relay::{relay_consumer, relay_health, relay_producer};
