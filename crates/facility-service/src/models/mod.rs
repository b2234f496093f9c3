//! Facility service models.
//!
//! Contains the booking and access-log records plus the request/response
//! types of the REST surface. Every JSON body uses camelCase keys.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::time_window::{self, hhmm};
use serde::{Deserialize, Serialize};

/// Decorative marker the booking UI appends to room names.
pub const ROOM_MARKER: char = '▼';

/// Prefix of a scanned booking QR payload.
pub const QR_PREFIX: &str = "BK:";

/// Maximum access log entries returned per query.
pub const ACCESS_LOG_LIMIT: i64 = 100;

/// Strip the UI marker (and whitespace around it) and trim the result.
///
/// Applied to every room name before storage and before comparison.
pub fn normalize_room(raw: &str) -> String {
    raw.split(ROOM_MARKER).map(str::trim).collect()
}

// ============================================================================
// Booking
// ============================================================================

/// A stored room booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Time-derived identifier, e.g. `BKM2X7QZ1A`.
    pub booking_id: String,

    /// Normalized room name.
    pub room: String,

    /// Civil date of the booking.
    pub date: NaiveDate,

    /// Inclusive start for check-in, inclusive lower bound for overlap.
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,

    /// Exclusive for overlap, inclusive for check-in.
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,

    pub booker_name: String,

    pub purpose: String,

    /// Display-only palette color.
    pub color: String,

    /// First successful check-in, stamped once.
    pub first_check_in: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Booking fields exposed by the check-in endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub booking_id: String,
    pub room: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub booker_name: String,
    pub purpose: String,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.booking_id.clone(),
            room: booking.room.clone(),
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            booker_name: booking.booker_name.clone(),
            purpose: booking.purpose.clone(),
        }
    }
}

/// Request body for `POST /api/bookings`.
///
/// All fields are optional at the serde layer so that a missing field is
/// reported as a validation error (400) instead of a decode rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub room: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub booker_name: Option<String>,
    pub purpose: Option<String>,
}

/// A validated, normalized booking ready for the overlap check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub room: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub booker_name: String,
    pub purpose: String,
}

impl CreateBookingRequest {
    /// Validate presence and format, normalizing the room name.
    pub fn validate(&self) -> Result<NewBooking, &'static str> {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let (Some(room), Some(date), Some(start), Some(end), Some(booker_name)) = (
            present(&self.room),
            present(&self.date),
            present(&self.start_time),
            present(&self.end_time),
            present(&self.booker_name),
        ) else {
            return Err("Missing required fields");
        };

        let room = normalize_room(room);
        if room.is_empty() {
            return Err("Missing required fields");
        }

        let date = time_window::parse_date(date).map_err(|_| "Date must be in YYYY-MM-DD format")?;
        let start_time =
            time_window::parse_hhmm(start).map_err(|_| "Start time must be in HH:MM format")?;
        let end_time =
            time_window::parse_hhmm(end).map_err(|_| "End time must be in HH:MM format")?;

        if start_time >= end_time {
            return Err("Start time must be before end time");
        }

        Ok(NewBooking {
            room,
            date,
            start_time,
            end_time,
            booker_name: booker_name.to_string(),
            purpose: self
                .purpose
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Query string for `GET /api/bookings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub date: Option<String>,
    pub room: Option<String>,
}

/// Generic success envelope carrying a payload.
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Success envelope carrying a message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// Access verification
// ============================================================================

/// Outcome of one verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    /// No booking with the scanned identifier.
    NotFound,
    /// Booking date is before today.
    Expired,
    /// Booking date is after today.
    NotToday,
    /// Earlier than `startTime - earlyAllowance`.
    TooEarly,
    /// Later than `endTime`.
    TooLate,
    Ok,
}

impl AccessReason {
    /// Returns the string representation stored in `access_logs.reason`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessReason::NotFound => "not_found",
            AccessReason::Expired => "expired",
            AccessReason::NotToday => "not_today",
            AccessReason::TooEarly => "too_early",
            AccessReason::TooLate => "too_late",
            AccessReason::Ok => "ok",
        }
    }

    /// Parse the stored representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_found" => Some(AccessReason::NotFound),
            "expired" => Some(AccessReason::Expired),
            "not_today" => Some(AccessReason::NotToday),
            "too_early" => Some(AccessReason::TooEarly),
            "too_late" => Some(AccessReason::TooLate),
            "ok" => Some(AccessReason::Ok),
            _ => None,
        }
    }

    /// Whether this outcome admits the holder.
    pub fn grants_access(&self) -> bool {
        matches!(self, AccessReason::Ok)
    }
}

/// Request body for `POST /api/verify`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
    /// Raw scanned payload. `qr_data` is accepted as a fallback key.
    #[serde(rename = "qrData", alias = "qr_data")]
    pub qr_data: Option<String>,
}

/// Response body for `POST /api/verify`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub access: bool,
    pub message: String,
    pub reason: AccessReason,
    pub is_first_check_in: bool,
    pub first_check_in: Option<DateTime<Utc>>,
    pub remaining_seconds: i64,
    pub booking: BookingSummary,
}

/// One row of the check-in audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub booking_id: String,
    pub room: Option<String>,
    pub booker_name: Option<String>,
    pub attempt_time: DateTime<Utc>,
    pub access_granted: bool,
    pub reason: AccessReason,
    pub is_first_check_in: bool,
}

/// Query string for `GET /api/logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessLogQuery {
    pub date: Option<String>,
    pub room: Option<String>,
}

/// Query string for `GET /api/active-booking`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveBookingQuery {
    pub room: Option<String>,
}

/// Response body for `GET /api/active-booking`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBookingResponse {
    pub success: bool,
    pub has_active_booking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_checked_in: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_check_in: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Operational
// ============================================================================

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Database connectivity status.
    pub database: &'static str,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Relay status returned by `/relay/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayHealthResponse {
    pub status: &'static str,
    pub viewers: usize,
    pub relay_connected: bool,
    pub has_frame: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            room: Some("Meeting Room 1 ▼".to_string()),
            date: Some("2026-10-18".to_string()),
            start_time: Some("09:00".to_string()),
            end_time: Some("10:00".to_string()),
            booker_name: Some("Somchai".to_string()),
            purpose: None,
        }
    }

    #[test]
    fn test_normalize_room() {
        assert_eq!(normalize_room("Meeting Room 1 ▼"), "Meeting Room 1");
        assert_eq!(normalize_room("  Lab ▼  "), "Lab");
        assert_eq!(normalize_room("Lab"), "Lab");
        assert_eq!(normalize_room("Lab ▼ B"), "LabB");
        assert_eq!(normalize_room("▼"), "");
    }

    #[test]
    fn test_validate_normalizes_and_parses() {
        let new_booking = request().validate().expect("valid request");

        assert_eq!(new_booking.room, "Meeting Room 1");
        assert_eq!(new_booking.date.to_string(), "2026-10-18");
        assert_eq!(new_booking.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(new_booking.purpose, "");
    }

    #[test]
    fn test_validate_missing_fields() {
        for strip in 0..5 {
            let mut req = request();
            match strip {
                0 => req.room = None,
                1 => req.date = None,
                2 => req.start_time = Some("  ".to_string()),
                3 => req.end_time = None,
                _ => req.booker_name = Some(String::new()),
            }
            assert_eq!(req.validate(), Err("Missing required fields"));
        }
    }

    #[test]
    fn test_validate_marker_only_room_is_missing() {
        let mut req = request();
        req.room = Some(" ▼ ".to_string());
        assert_eq!(req.validate(), Err("Missing required fields"));
    }

    #[test]
    fn test_validate_rejects_malformed_times() {
        let mut req = request();
        req.start_time = Some("9am".to_string());
        assert_eq!(req.validate(), Err("Start time must be in HH:MM format"));

        let mut req = request();
        req.end_time = Some("09:00".to_string());
        assert_eq!(req.validate(), Err("Start time must be before end time"));

        let mut req = request();
        req.date = Some("18/10/2026".to_string());
        assert_eq!(req.validate(), Err("Date must be in YYYY-MM-DD format"));
    }

    #[test]
    fn test_booking_serializes_camel_case() {
        let booking = Booking {
            booking_id: "BKABC".to_string(),
            room: "Lab".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            booker_name: "Somchai".to_string(),
            purpose: String::new(),
            color: "#4dd0e1".to_string(),
            first_check_in: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["bookingId"], "BKABC");
        assert_eq!(json["date"], "2026-10-18");
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["endTime"], "10:30");
        assert!(json["firstCheckIn"].is_null());
    }

    #[test]
    fn test_access_reason_round_trips_storage_form() {
        for reason in [
            AccessReason::NotFound,
            AccessReason::Expired,
            AccessReason::NotToday,
            AccessReason::TooEarly,
            AccessReason::TooLate,
            AccessReason::Ok,
        ] {
            assert_eq!(AccessReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(AccessReason::parse("maybe"), None);
        assert!(AccessReason::Ok.grants_access());
        assert!(!AccessReason::TooLate.grants_access());
    }

    #[test]
    fn test_verify_request_accepts_fallback_key() {
        let primary: VerifyRequest = serde_json::from_str(r#"{"qrData":"BK:X"}"#).unwrap();
        let fallback: VerifyRequest = serde_json::from_str(r#"{"qr_data":"BK:Y"}"#).unwrap();
        let empty: VerifyRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(primary.qr_data.as_deref(), Some("BK:X"));
        assert_eq!(fallback.qr_data.as_deref(), Some("BK:Y"));
        assert!(empty.qr_data.is_none());
    }
}
