//! Repository layer for the facility service.
//!
//! Provides database access following the Handler -> Service -> Repository
//! architecture. Repositories are stateless and take the pool per call.

pub mod access_logs;
pub mod bookings;

pub use access_logs::{AccessLogsRepository, NewAccessLog};
pub use bookings::{BookingsRepository, InsertOutcome, RoomRepair};
