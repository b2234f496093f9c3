//! Booking service.
//!
//! Validates and normalizes booking requests, allocates identifiers and
//! display colors, and enforces the no-overlap rule through the repository.
//!
//! # Identifiers
//!
//! A booking id is `BK` followed by the creation instant in Unix
//! milliseconds, rendered as uppercase base-36. When two bookings are
//! created within the same millisecond the unique index rejects the second
//! one, and the id is regenerated with a random two character suffix.

use crate::errors::FacilityError;
use crate::models::{normalize_room, Booking, BookingListQuery, CreateBookingRequest};
use crate::observability::metrics;
use crate::repositories::{BookingsRepository, InsertOutcome};
use crate::services::clock::Clock;
use chrono::{DateTime, Utc};
use common::time_window;
use ring::rand::{SecureRandom, SystemRandom};
use sqlx::PgPool;
use tracing::instrument;

/// Display palette; colors carry no meaning and may repeat.
pub const PALETTE: [&str; 5] = ["#4dd0e1", "#81c784", "#ffb74d", "#ba68c8", "#64b5f6"];

/// Prefix of every booking id.
pub const BOOKING_ID_PREFIX: &str = "BK";

/// Maximum insert attempts when the generated id collides.
const MAX_ID_ATTEMPTS: usize = 3;

/// Length of the random suffix appended after a collision.
const ID_SUFFIX_LENGTH: usize = 2;

const BASE36_CHARS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Service for booking operations.
pub struct BookingService;

impl BookingService {
    /// Create a booking.
    ///
    /// # Errors
    ///
    /// - `FacilityError::BadRequest` - Missing or malformed fields
    /// - `FacilityError::Conflict` - Interval overlaps an existing booking
    ///   in the same room on the same date
    /// - `FacilityError::Database` - Database operation failed
    #[instrument(skip_all, name = "facility.service.create_booking")]
    pub async fn create(
        pool: &PgPool,
        clock: &dyn Clock,
        request: &CreateBookingRequest,
    ) -> Result<Booking, FacilityError> {
        let new_booking = request.validate().map_err(|reason| {
            metrics::record_booking("bad_request");
            FacilityError::BadRequest(reason.to_string())
        })?;

        let created_at = clock.now();
        let base_id = booking_id_at(created_at);
        let color = pick_color()?;

        for attempt in 0..MAX_ID_ATTEMPTS {
            let booking_id = if attempt == 0 {
                base_id.clone()
            } else {
                format!("{}{}", base_id, random_suffix()?)
            };

            let outcome = BookingsRepository::insert(
                pool,
                &booking_id,
                &new_booking,
                color,
                created_at,
            )
            .await;

            match outcome {
                Ok(InsertOutcome::Inserted(booking)) => {
                    metrics::record_booking("created");
                    tracing::info!(
                        target: "facility.bookings",
                        booking_id = %booking.booking_id,
                        room = %booking.room,
                        date = %booking.date,
                        start_time = %time_window::format_hhmm(booking.start_time),
                        end_time = %time_window::format_hhmm(booking.end_time),
                        "Booking created"
                    );
                    return Ok(booking);
                }
                Ok(InsertOutcome::Overlap) => {
                    let existing = BookingsRepository::find_conflict(
                        pool,
                        &new_booking.room,
                        new_booking.date,
                        new_booking.start_time,
                        new_booking.end_time,
                    )
                    .await?;

                    if let Some(existing) = existing {
                        metrics::record_booking("conflict");
                        tracing::info!(
                            target: "facility.bookings",
                            room = %new_booking.room,
                            date = %new_booking.date,
                            conflict_with = %existing.booking_id,
                            "Booking rejected: overlapping interval"
                        );
                        return Err(FacilityError::booking_conflict(existing));
                    }

                    // The conflicting row was deleted between the insert and
                    // the lookup; try again.
                    tracing::debug!(
                        target: "facility.bookings",
                        attempt = attempt + 1,
                        "Conflicting booking vanished, retrying insert"
                    );
                }
                Ok(InsertOutcome::DuplicateId) => {
                    tracing::debug!(
                        target: "facility.bookings",
                        booking_id = %booking_id,
                        attempt = attempt + 1,
                        "Booking id collision, regenerating"
                    );
                }
                Err(e) => {
                    metrics::record_booking("error");
                    return Err(e);
                }
            }
        }

        metrics::record_booking("error");
        tracing::error!(
            target: "facility.bookings",
            attempts = MAX_ID_ATTEMPTS,
            "Failed to store booking after max attempts"
        );
        Err(FacilityError::Internal)
    }

    /// List bookings with optional `date` and `room` filters (AND).
    ///
    /// Blank filters are treated as absent.
    #[instrument(skip_all, name = "facility.service.list_bookings")]
    pub async fn list(
        pool: &PgPool,
        query: &BookingListQuery,
    ) -> Result<Vec<Booking>, FacilityError> {
        let date = match query.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(time_window::parse_date(raw).map_err(|_| {
                FacilityError::BadRequest("Date must be in YYYY-MM-DD format".to_string())
            })?),
            _ => None,
        };
        let room = query
            .room
            .as_deref()
            .map(normalize_room)
            .filter(|room| !room.is_empty());

        BookingsRepository::list(pool, date, room.as_deref()).await
    }

    /// Delete a booking by id.
    ///
    /// # Errors
    ///
    /// - `FacilityError::NotFound` - No booking with this id
    #[instrument(skip_all, name = "facility.service.delete_booking", fields(booking_id = %booking_id))]
    pub async fn delete(pool: &PgPool, booking_id: &str) -> Result<(), FacilityError> {
        let booking_id = booking_id.trim();

        if !BookingsRepository::delete(pool, booking_id).await? {
            return Err(FacilityError::NotFound("Booking not found".to_string()));
        }

        tracing::info!(target: "facility.bookings", booking_id = %booking_id, "Booking deleted");
        Ok(())
    }
}

/// Booking id for a creation instant: `BK` + base-36 Unix milliseconds.
pub fn booking_id_at(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    format!("{}{}", BOOKING_ID_PREFIX, to_base36(millis))
}

/// Uppercase base-36 rendering of `value`.
fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        let idx = (value % 36) as usize;
        if let Some(ch) = BASE36_CHARS.get(idx) {
            digits.push(*ch);
        }
        value /= 36;
    }
    digits.reverse();

    String::from_utf8(digits).unwrap_or_default()
}

/// Random base-36 suffix drawn from the CSPRNG.
fn random_suffix() -> Result<String, FacilityError> {
    let mut bytes = [0u8; ID_SUFFIX_LENGTH];
    fill_random(&mut bytes)?;

    Ok(bytes
        .iter()
        .filter_map(|b| BASE36_CHARS.get(usize::from(*b) % BASE36_CHARS.len()))
        .map(|ch| char::from(*ch))
        .collect())
}

/// Pick a palette color.
fn pick_color() -> Result<&'static str, FacilityError> {
    let mut byte = [0u8; 1];
    fill_random(&mut byte)?;

    let idx = usize::from(byte.first().copied().unwrap_or_default()) % PALETTE.len();
    PALETTE.get(idx).copied().ok_or(FacilityError::Internal)
}

fn fill_random(dest: &mut [u8]) -> Result<(), FacilityError> {
    SystemRandom::new().fill(dest).map_err(|e| {
        tracing::error!(target: "facility.bookings", error = %e, "Failed to generate random bytes");
        FacilityError::Internal
    })
}
