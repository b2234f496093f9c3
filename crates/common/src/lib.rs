//! Common utilities and types shared across the facility dashboard crates.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for `HH:MM` parsing and interval predicates
pub mod time_window;

/// Module for the fixed service-time convention
pub mod service_time;

/// Module for secret types that prevent accidental logging
pub mod secret;
