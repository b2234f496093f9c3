//! Observability module for the facility service.
//!
//! Provides metrics definitions and instrumentation helpers.

pub mod metrics;
