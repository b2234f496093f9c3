//! Booking handlers.
//!
//! - `GET /api/bookings` - List bookings, optionally filtered by `date` and `room`
//! - `POST /api/bookings` - Create a booking
//! - `DELETE /api/bookings/{id}` - Delete a booking

use crate::errors::FacilityError;
use crate::models::{Booking, BookingListQuery, CreateBookingRequest, DataResponse, MessageResponse};
use crate::observability::metrics;
use crate::routes::AppState;
use crate::services::BookingService;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/bookings
///
/// Bookings are ordered by date, then start time.
#[instrument(skip_all, name = "facility.bookings.list")]
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<DataResponse<Vec<Booking>>>, FacilityError> {
    let bookings = BookingService::list(&state.pool, &query).await?;
    Ok(Json(DataResponse::ok(bookings)))
}

/// Handler for POST /api/bookings
///
/// # Response
///
/// - 201 Created: Booking stored
/// - 400 Bad Request: Invalid body or missing/malformed fields
/// - 409 Conflict: Overlaps an existing booking; body carries `conflictWith`
#[instrument(
    skip_all,
    name = "facility.bookings.create",
    fields(method = "POST", endpoint = "/api/bookings")
)]
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<DataResponse<Booking>>), FacilityError> {
    // Deserialize manually to return 400 (not Axum's default 422)
    let request: CreateBookingRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "facility.handlers.bookings", error = %e, "Invalid request body");
        metrics::record_booking("bad_request");
        FacilityError::BadRequest("Invalid request body".to_string())
    })?;

    let booking = BookingService::create(&state.pool, state.clock.as_ref(), &request).await?;

    Ok((StatusCode::CREATED, Json(DataResponse::ok(booking))))
}

/// Handler for DELETE /api/bookings/{id}
///
/// Access log entries referencing the booking are kept.
#[instrument(skip_all, name = "facility.bookings.delete")]
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<Json<MessageResponse>, FacilityError> {
    BookingService::delete(&state.pool, &booking_id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Booking deleted".to_string(),
    }))
}
