//! # Facility Test Utilities
//!
//! Shared test utilities for the facility service.
//!
//! - Server test harness (`TestFacilityServer` for E2E tests)
//! - Civil-time helpers for pinning the clock in the service zone
//!
//! ## Usage
//!
//! ```rust,ignore
//! use facility_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<(), anyhow::Error> {
//!     let server = TestFacilityServer::spawn_at(pool, service_instant("2026-10-18", "08:50")).await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .get(format!("{}/api/bookings", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

pub use server_harness::*;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::service_time::ServiceTimeZone;

/// UTC instant of civil `date` `time` in the default service zone.
///
/// # Panics
///
/// Panics on malformed input.
pub fn service_instant(date: &str, time: &str) -> DateTime<Utc> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date must be YYYY-MM-DD");
    let time = NaiveTime::parse_from_str(time, "%H:%M").expect("time must be HH:MM");
    ServiceTimeZone::default().to_instant(date.and_time(time))
}
