//! Check-in handlers.
//!
//! - `POST /api/verify` - Evaluate a scanned QR payload
//! - `GET /api/active-booking` - Booking currently in its access window for a room
//! - `GET /api/logs` - Access audit trail

use crate::errors::FacilityError;
use crate::models::{
    AccessLogEntry, AccessLogQuery, ActiveBookingQuery, ActiveBookingResponse, DataResponse,
    VerifyRequest, VerifyResponse,
};
use crate::routes::AppState;
use crate::services::{AccessVerifier, CheckInPolicy};
use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/verify
///
/// Every attempt that names a booking id is written to the audit trail,
/// including denials. An empty payload is rejected before logging.
///
/// # Response
///
/// - 200 OK: Evaluated; `access` tells whether entry is granted
/// - 400 Bad Request: Invalid body or empty payload
/// - 404 Not Found: Unknown booking id (`reason: "not_found"`)
#[instrument(
    skip_all,
    name = "facility.access.verify",
    fields(method = "POST", endpoint = "/api/verify")
)]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<VerifyResponse>, FacilityError> {
    let request: VerifyRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "facility.handlers.access", error = %e, "Invalid request body");
        FacilityError::BadRequest("Invalid request body".to_string())
    })?;

    let policy = CheckInPolicy::from_config(&state.config);
    let response =
        AccessVerifier::verify(&state.pool, state.clock.as_ref(), &policy, &request).await?;

    Ok(Json(response))
}

/// Handler for GET /api/active-booking?room=
#[instrument(skip_all, name = "facility.access.active_booking")]
pub async fn active_booking(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveBookingQuery>,
) -> Result<Json<ActiveBookingResponse>, FacilityError> {
    let policy = CheckInPolicy::from_config(&state.config);
    let response =
        AccessVerifier::active_booking(&state.pool, state.clock.as_ref(), &policy, &query).await?;

    Ok(Json(response))
}

/// Handler for GET /api/logs?date=&room=
#[instrument(skip_all, name = "facility.access.logs")]
pub async fn access_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessLogQuery>,
) -> Result<Json<DataResponse<Vec<AccessLogEntry>>>, FacilityError> {
    let policy = CheckInPolicy::from_config(&state.config);
    let logs = AccessVerifier::logs(&state.pool, &policy, &query).await?;

    Ok(Json(DataResponse::ok(logs)))
}
