//! Check-in / access verification.
//!
//! Each scan is evaluated freshly against the booking's civil date and the
//! inclusive window `[start - early_allowance, end]`. The only persisted
//! state is `first_check_in`, stamped on the first admitted scan.
//!
//! Every scan that reaches a booking lookup appends exactly one access log
//! entry, whatever the outcome. A scan with an empty payload is rejected
//! before the lookup and is not logged.

use crate::config::Config;
use crate::errors::FacilityError;
use crate::models::{
    normalize_room, AccessLogEntry, AccessLogQuery, AccessReason, ActiveBookingQuery,
    ActiveBookingResponse, Booking, BookingSummary, VerifyRequest, VerifyResponse,
    ACCESS_LOG_LIMIT, QR_PREFIX,
};
use crate::observability::metrics;
use crate::repositories::{AccessLogsRepository, BookingsRepository, NewAccessLog};
use crate::services::clock::Clock;
use chrono::NaiveDateTime;
use common::service_time::ServiceTimeZone;
use common::time_window::{self, AccessWindow, WindowPosition};
use sqlx::PgPool;
use tracing::instrument;

/// Time convention and allowance used for every window decision.
#[derive(Debug, Clone, Copy)]
pub struct CheckInPolicy {
    pub zone: ServiceTimeZone,
    pub early_allowance_minutes: i64,
}

impl CheckInPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            zone: config.service_time_zone,
            early_allowance_minutes: config.early_allowance_minutes,
        }
    }

    fn window(&self, booking: &Booking) -> AccessWindow {
        AccessWindow::new(
            booking.start_time,
            booking.end_time,
            self.early_allowance_minutes,
        )
    }
}

/// Outcome of evaluating one booking at one civil instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub reason: AccessReason,
    pub message: String,
}

/// Extract the booking id from a scanned payload.
///
/// The payload is trimmed and an optional `BK:` prefix removed.
///
/// # Errors
///
/// Returns `FacilityError::BadRequest` when nothing is left.
pub fn parse_scan_payload(raw: Option<&str>) -> Result<String, FacilityError> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    let booking_id = trimmed.strip_prefix(QR_PREFIX).unwrap_or(trimmed).trim();

    if booking_id.is_empty() {
        return Err(FacilityError::BadRequest(
            "QR code data is missing".to_string(),
        ));
    }

    Ok(booking_id.to_string())
}

/// Evaluate a booking against the current civil date and time.
pub fn evaluate(booking: &Booking, now: NaiveDateTime, policy: &CheckInPolicy) -> Evaluation {
    let today = now.date();

    if booking.date < today {
        return Evaluation {
            reason: AccessReason::Expired,
            message: "This booking has expired".to_string(),
        };
    }

    if booking.date > today {
        return Evaluation {
            reason: AccessReason::NotToday,
            message: format!("This booking is for {}", booking.date),
        };
    }

    match policy.window(booking).position(time_window::minutes_of(now.time())) {
        WindowPosition::Early { wait_minutes } => Evaluation {
            reason: AccessReason::TooEarly,
            message: format!("Too early. Please wait {} more minutes", wait_minutes),
        },
        WindowPosition::Closed => Evaluation {
            reason: AccessReason::TooLate,
            message: "The booking time has passed".to_string(),
        },
        WindowPosition::Open => Evaluation {
            reason: AccessReason::Ok,
            message: "Access granted".to_string(),
        },
    }
}

/// Seconds left in the booking, zero unless it is today's booking.
fn remaining_seconds_for(booking: &Booking, now: NaiveDateTime) -> i64 {
    if booking.date == now.date() {
        time_window::remaining_seconds(now.time(), booking.end_time)
    } else {
        0
    }
}

/// Service for check-in verification and its audit trail.
pub struct AccessVerifier;

impl AccessVerifier {
    /// Verify a scanned payload.
    ///
    /// # Errors
    ///
    /// - `FacilityError::BadRequest` - Empty payload (not logged)
    /// - `FacilityError::BookingNotFound` - Unknown id (logged as `not_found`)
    /// - `FacilityError::Database` - Database operation failed
    #[instrument(skip_all, name = "facility.service.verify")]
    pub async fn verify(
        pool: &PgPool,
        clock: &dyn Clock,
        policy: &CheckInPolicy,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, FacilityError> {
        let booking_id = parse_scan_payload(request.qr_data.as_deref())?;
        let now = clock.now();

        let Some(booking) = BookingsRepository::get_by_id(pool, &booking_id).await? else {
            AccessLogsRepository::append(
                pool,
                &NewAccessLog {
                    booking_id: &booking_id,
                    room: None,
                    booker_name: None,
                    attempt_time: now,
                    reason: AccessReason::NotFound,
                    is_first_check_in: false,
                },
            )
            .await?;

            metrics::record_access_attempt(AccessReason::NotFound.as_str());
            tracing::info!(
                target: "facility.access",
                booking_id = %booking_id,
                reason = AccessReason::NotFound.as_str(),
                "Access denied: unknown booking"
            );
            return Err(FacilityError::BookingNotFound { booking_id });
        };

        let now_civil = policy.zone.to_civil(now);
        let evaluation = evaluate(&booking, now_civil, policy);

        let mut first_check_in = booking.first_check_in;
        let mut is_first_check_in = false;

        if evaluation.reason.grants_access() && first_check_in.is_none() {
            match BookingsRepository::stamp_first_check_in(pool, &booking.booking_id, now).await? {
                Some(stamped) => {
                    first_check_in = Some(stamped);
                    is_first_check_in = true;
                }
                None => {
                    // A concurrent scan stamped it first
                    first_check_in = BookingsRepository::get_by_id(pool, &booking.booking_id)
                        .await?
                        .and_then(|b| b.first_check_in);
                }
            }
        }

        AccessLogsRepository::append(
            pool,
            &NewAccessLog {
                booking_id: &booking.booking_id,
                room: Some(&booking.room),
                booker_name: Some(&booking.booker_name),
                attempt_time: now,
                reason: evaluation.reason,
                is_first_check_in,
            },
        )
        .await?;

        metrics::record_access_attempt(evaluation.reason.as_str());
        tracing::info!(
            target: "facility.access",
            booking_id = %booking.booking_id,
            room = %booking.room,
            reason = evaluation.reason.as_str(),
            is_first_check_in,
            "Access evaluated"
        );

        Ok(VerifyResponse {
            success: true,
            access: evaluation.reason.grants_access(),
            message: evaluation.message,
            reason: evaluation.reason,
            is_first_check_in,
            first_check_in,
            remaining_seconds: remaining_seconds_for(&booking, now_civil),
            booking: BookingSummary::from(&booking),
        })
    }

    /// The booking whose access window contains "now" for a room.
    ///
    /// # Errors
    ///
    /// - `FacilityError::BadRequest` - Missing room
    #[instrument(skip_all, name = "facility.service.active_booking")]
    pub async fn active_booking(
        pool: &PgPool,
        clock: &dyn Clock,
        policy: &CheckInPolicy,
        query: &ActiveBookingQuery,
    ) -> Result<ActiveBookingResponse, FacilityError> {
        let room = query
            .room
            .as_deref()
            .map(normalize_room)
            .filter(|room| !room.is_empty())
            .ok_or_else(|| FacilityError::BadRequest("Missing room parameter".to_string()))?;

        let now_civil = policy.zone.to_civil(clock.now());
        let current_minutes = time_window::minutes_of(now_civil.time());

        let bookings = BookingsRepository::bookings_for_day(pool, &room, now_civil.date()).await?;
        let active = bookings
            .iter()
            .find(|booking| policy.window(booking).contains(current_minutes));

        let response = match active {
            Some(booking) => ActiveBookingResponse {
                success: true,
                has_active_booking: true,
                is_checked_in: Some(booking.first_check_in.is_some()),
                first_check_in: booking.first_check_in,
                remaining_seconds: Some(remaining_seconds_for(booking, now_civil)),
                booking: Some(BookingSummary::from(booking)),
                message: None,
            },
            None => ActiveBookingResponse {
                success: true,
                has_active_booking: false,
                is_checked_in: None,
                first_check_in: None,
                remaining_seconds: None,
                booking: None,
                message: Some("No active booking at this time".to_string()),
            },
        };

        Ok(response)
    }

    /// Access log entries, newest first, at most [`ACCESS_LOG_LIMIT`].
    ///
    /// `date` selects one civil day in the service zone; `room` is
    /// normalized before matching.
    #[instrument(skip_all, name = "facility.service.access_logs")]
    pub async fn logs(
        pool: &PgPool,
        policy: &CheckInPolicy,
        query: &AccessLogQuery,
    ) -> Result<Vec<AccessLogEntry>, FacilityError> {
        let range = match query.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let date = time_window::parse_date(raw).map_err(|_| {
                    FacilityError::BadRequest("Date must be in YYYY-MM-DD format".to_string())
                })?;
                Some(policy.zone.day_bounds(date))
            }
            _ => None,
        };
        let room = query
            .room
            .as_deref()
            .map(normalize_room)
            .filter(|room| !room.is_empty());

        AccessLogsRepository::list(pool, range, room.as_deref(), ACCESS_LOG_LIMIT).await
    }
}
