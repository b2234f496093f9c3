//! Facility service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and are
//! serialized into the envelope `{ "success": false, "error": "..." }`.
//! Storage failures return a generic message; the detail is logged
//! server-side.

use crate::models::{AccessReason, Booking};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::time_window;
use serde::Serialize;
use thiserror::Error;

/// Facility service error type.
///
/// Maps to HTTP status codes:
/// - BadRequest: 400 Bad Request
/// - RelayUnauthorized: 401 Unauthorized (upgrade refused)
/// - NotFound, BookingNotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum FacilityError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        conflict_with: Box<Booking>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Booking not found: {booking_id}")]
    BookingNotFound { booking_id: String },

    #[error("Relay producer key rejected")]
    RelayUnauthorized,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

impl FacilityError {
    /// Build the conflict error surfaced to the person booking, naming the
    /// holder and time range of the existing booking.
    pub fn booking_conflict(existing: Booking) -> Self {
        FacilityError::Conflict {
            message: format!(
                "Time slot {} - {} is already booked by {}",
                time_window::format_hhmm(existing.start_time),
                time_window::format_hhmm(existing.end_time),
                existing.booker_name
            ),
            conflict_with: Box::new(existing),
        }
    }

    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            FacilityError::BadRequest(_) => 400,
            FacilityError::RelayUnauthorized => 401,
            FacilityError::NotFound(_) | FacilityError::BookingNotFound { .. } => 404,
            FacilityError::Conflict { .. } => 409,
            FacilityError::Database(_) | FacilityError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflict_with: Option<Box<Booking>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<AccessReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    booking_id: Option<String>,
}

impl ErrorResponse {
    fn message(error: String) -> Self {
        Self {
            success: false,
            error,
            conflict_with: None,
            access: None,
            reason: None,
            booking_id: None,
        }
    }
}

impl IntoResponse for FacilityError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            FacilityError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::message(reason))
            }
            FacilityError::Conflict {
                message,
                conflict_with,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    conflict_with: Some(conflict_with),
                    ..ErrorResponse::message(message)
                },
            ),
            FacilityError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, ErrorResponse::message(resource))
            }
            FacilityError::BookingNotFound { booking_id } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    access: Some(false),
                    reason: Some(AccessReason::NotFound),
                    booking_id: Some(booking_id),
                    ..ErrorResponse::message("Booking not found".to_string())
                },
            ),
            FacilityError::RelayUnauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::message("Unauthorized".to_string()),
            ),
            FacilityError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "facility.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::message("An internal database error occurred".to_string()),
                )
            }
            FacilityError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::message("An internal error occurred".to_string()),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Convert sqlx errors to FacilityError
impl From<sqlx::Error> for FacilityError {
    fn from(err: sqlx::Error) -> Self {
        FacilityError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn existing_booking() -> Booking {
        Booking {
            booking_id: "BKEXISTING".to_string(),
            room: "Lab".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            booker_name: "Somchai".to_string(),
            purpose: String::new(),
            color: "#81c784".to_string(),
            first_check_in: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_bad_request() {
        let error = FacilityError::BadRequest("Missing required fields".to_string());
        assert_eq!(format!("{}", error), "Bad request: Missing required fields");
    }

    #[test]
    fn test_booking_conflict_message_names_holder() {
        let error = FacilityError::booking_conflict(existing_booking());
        assert_eq!(
            format!("{}", error),
            "Conflict: Time slot 09:00 - 10:00 is already booked by Somchai"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FacilityError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(FacilityError::RelayUnauthorized.status_code(), 401);
        assert_eq!(FacilityError::NotFound("x".to_string()).status_code(), 404);
        assert_eq!(
            FacilityError::BookingNotFound {
                booking_id: "x".to_string()
            }
            .status_code(),
            404
        );
        assert_eq!(
            FacilityError::booking_conflict(existing_booking()).status_code(),
            409
        );
        assert_eq!(FacilityError::Database("x".to_string()).status_code(), 500);
        assert_eq!(FacilityError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let response = FacilityError::BadRequest("Missing required fields".to_string())
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], "Missing required fields");
        assert!(body_json.get("conflictWith").is_none());
    }

    #[tokio::test]
    async fn test_into_response_conflict_carries_booking() {
        let response = FacilityError::booking_conflict(existing_booking()).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["conflictWith"]["bookingId"], "BKEXISTING");
        assert_eq!(body_json["conflictWith"]["startTime"], "09:00");
        assert_eq!(body_json["conflictWith"]["bookerName"], "Somchai");
    }

    #[tokio::test]
    async fn test_into_response_booking_not_found() {
        let response = FacilityError::BookingNotFound {
            booking_id: "BKMISSING".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["access"], false);
        assert_eq!(body_json["reason"], "not_found");
        assert_eq!(body_json["bookingId"], "BKMISSING");
    }

    #[tokio::test]
    async fn test_into_response_database_error_is_generic() {
        let response =
            FacilityError::Database("relation \"bookings\" does not exist".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "An internal database error occurred");
    }

    #[tokio::test]
    async fn test_into_response_relay_unauthorized() {
        let response = FacilityError::RelayUnauthorized.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], "Unauthorized");
    }
}
