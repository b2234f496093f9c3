//! Access logs repository.
//!
//! The `access_logs` table is append-only: rows are inserted by the
//! verifier and never updated or deleted.

use crate::errors::FacilityError;
use crate::models::{AccessLogEntry, AccessReason};
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Instant;
use tracing::instrument;

/// A verification attempt about to be recorded.
#[derive(Debug, Clone)]
pub struct NewAccessLog<'a> {
    pub booking_id: &'a str,
    /// `None` when the booking was not found.
    pub room: Option<&'a str>,
    pub booker_name: Option<&'a str>,
    pub attempt_time: DateTime<Utc>,
    pub reason: AccessReason,
    pub is_first_check_in: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct AccessLogRow {
    booking_id: String,
    room: Option<String>,
    booker_name: Option<String>,
    attempt_time: DateTime<Utc>,
    access_granted: bool,
    reason: String,
    is_first_check_in: bool,
}

impl TryFrom<AccessLogRow> for AccessLogEntry {
    type Error = FacilityError;

    fn try_from(row: AccessLogRow) -> Result<Self, Self::Error> {
        let reason = AccessReason::parse(&row.reason).ok_or_else(|| {
            FacilityError::Database(format!("Unrecognized access reason '{}'", row.reason))
        })?;

        Ok(AccessLogEntry {
            booking_id: row.booking_id,
            room: row.room,
            booker_name: row.booker_name,
            attempt_time: row.attempt_time,
            access_granted: row.access_granted,
            reason,
            is_first_check_in: row.is_first_check_in,
        })
    }
}

/// Repository for the check-in audit trail.
pub struct AccessLogsRepository;

impl AccessLogsRepository {
    /// Append one attempt.
    #[instrument(skip_all, name = "facility.repo.append_access_log", fields(booking_id = %entry.booking_id, reason = entry.reason.as_str()))]
    pub async fn append(pool: &PgPool, entry: &NewAccessLog<'_>) -> Result<(), FacilityError> {
        let start = Instant::now();

        sqlx::query(
            r#"
            INSERT INTO access_logs (
                booking_id, room, booker_name, attempt_time,
                access_granted, reason, is_first_check_in
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.booking_id)
        .bind(entry.room)
        .bind(entry.booker_name)
        .bind(entry.attempt_time)
        .bind(entry.reason.grants_access())
        .bind(entry.reason.as_str())
        .bind(entry.is_first_check_in)
        .execute(pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("append_access_log", "error", start.elapsed());
            FacilityError::Database(format!("Failed to append access log: {}", e))
        })?;

        metrics::record_db_query("append_access_log", "success", start.elapsed());

        Ok(())
    }

    /// Most recent attempts first.
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `range` - Optional half-open `[from, to)` window on `attempt_time`
    /// * `room` - Optional normalized room name
    /// * `limit` - Maximum rows returned
    #[instrument(skip_all, name = "facility.repo.list_access_logs")]
    pub async fn list(
        pool: &PgPool,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        room: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, FacilityError> {
        let start = Instant::now();
        let (from, to) = range.unzip();

        let rows: Vec<AccessLogRow> = sqlx::query_as(
            r#"
            SELECT booking_id, room, booker_name, attempt_time,
                   access_granted, reason, is_first_check_in
            FROM access_logs
            WHERE ($1::timestamptz IS NULL OR attempt_time >= $1)
              AND ($2::timestamptz IS NULL OR attempt_time < $2)
              AND ($3::text IS NULL OR room = $3)
            ORDER BY attempt_time DESC, log_id DESC
            LIMIT $4
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(room)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("list_access_logs", "error", start.elapsed());
            FacilityError::Database(format!("Failed to list access logs: {}", e))
        })?;

        metrics::record_db_query("list_access_logs", "success", start.elapsed());

        rows.into_iter().map(AccessLogEntry::try_from).collect()
    }
}
