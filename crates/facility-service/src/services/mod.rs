//! Service layer for the facility service.
//!
//! # Components
//!
//! - `access_verifier` - QR check-in evaluation and the access audit trail
//! - `booking_service` - Booking creation with overlap enforcement
//! - `clock` - Injectable source of "now"

pub mod access_verifier;
pub mod booking_service;
pub mod clock;

pub use access_verifier::{AccessVerifier, CheckInPolicy};
pub use booking_service::BookingService;
pub use clock::{Clock, SystemClock};
