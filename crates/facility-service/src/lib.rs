//! Facility Service Library
//!
//! Backend for the facility dashboard:
//!
//! - Room bookings with a no-overlap guarantee per room and date
//! - QR check-in against each booking's access window, with an audit trail
//! - A relay that fans one CCTV producer's frames out to many viewers
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! The relay keeps its state in memory (`relay::RelayHub`) and never
//! touches the database.
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP and WebSocket handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Request, response and domain types
//! - `observability` - Prometheus metrics
//! - `relay` - Frame relay hub
//! - `repositories` - Database access
//! - `routes` - Axum router and application state
//! - `services` - Booking and check-in logic

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod relay;
pub mod repositories;
pub mod routes;
pub mod services;
