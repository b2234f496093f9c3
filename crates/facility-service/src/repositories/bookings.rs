//! Bookings repository for database operations.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - The insert is a single statement guarded by an overlap predicate, and
//!   the `bookings_no_overlap` exclusion constraint rejects any row that
//!   slips past it under concurrent inserts

use crate::errors::FacilityError;
use crate::models::{Booking, NewBooking};
use crate::observability::metrics;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use std::time::Instant;
use tracing::instrument;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

const BOOKING_COLUMNS: &str = "booking_id, room, booking_date, start_time, end_time, \
     booker_name, purpose, color, first_check_in, created_at";

/// Raw `bookings` row.
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    booking_id: String,
    room: String,
    booking_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    booker_name: String,
    purpose: String,
    color: String,
    first_check_in: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            booking_id: row.booking_id,
            room: row.room,
            date: row.booking_date,
            start_time: row.start_time,
            end_time: row.end_time,
            booker_name: row.booker_name,
            purpose: row.purpose,
            color: row.color,
            first_check_in: row.first_check_in,
            created_at: row.created_at,
        }
    }
}

/// Result of an insert attempt.
#[derive(Debug)]
pub enum InsertOutcome {
    /// The row was stored.
    Inserted(Booking),
    /// Another booking already holds this identifier.
    DuplicateId,
    /// The interval intersects an existing booking for the same room and date.
    Overlap,
}

/// Result of the stored room name repair.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RoomRepair {
    /// Rows whose room name was rewritten.
    pub updated: u64,
    /// Booking ids left as-is because the cleaned name would collide.
    pub skipped: Vec<String>,
}

/// Repository for booking operations.
pub struct BookingsRepository;

impl BookingsRepository {
    /// Insert a booking unless it overlaps an existing one.
    ///
    /// The `NOT EXISTS` predicate turns the common conflict into an empty
    /// result; the exclusion constraint catches the concurrent case.
    #[instrument(skip_all, name = "facility.repo.insert_booking", fields(room = %booking.room, date = %booking.date))]
    pub async fn insert(
        pool: &PgPool,
        booking_id: &str,
        booking: &NewBooking,
        color: &str,
        created_at: DateTime<Utc>,
    ) -> Result<InsertOutcome, FacilityError> {
        let start = Instant::now();

        let query = format!(
            r#"
            INSERT INTO bookings (
                booking_id, room, booking_date, start_time, end_time,
                booker_name, purpose, color, created_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
            WHERE NOT EXISTS (
                SELECT 1 FROM bookings
                WHERE room = $2
                  AND booking_date = $3
                  AND start_time < $5
                  AND end_time > $4
            )
            RETURNING {BOOKING_COLUMNS}
            "#
        );

        let result: Result<Option<BookingRow>, sqlx::Error> = sqlx::query_as(&query)
            .bind(booking_id) // $1
            .bind(&booking.room) // $2
            .bind(booking.date) // $3
            .bind(booking.start_time) // $4
            .bind(booking.end_time) // $5
            .bind(&booking.booker_name) // $6
            .bind(&booking.purpose) // $7
            .bind(color) // $8
            .bind(created_at) // $9
            .fetch_optional(pool)
            .await;

        let duration = start.elapsed();

        match result {
            Ok(Some(row)) => {
                metrics::record_db_query("insert_booking", "success", duration);
                Ok(InsertOutcome::Inserted(row.into()))
            }
            Ok(None) => {
                metrics::record_db_query("insert_booking", "success", duration);
                Ok(InsertOutcome::Overlap)
            }
            Err(e) => match sqlstate(&e).as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    metrics::record_db_query("insert_booking", "success", duration);
                    Ok(InsertOutcome::DuplicateId)
                }
                Some(EXCLUSION_VIOLATION) => {
                    metrics::record_db_query("insert_booking", "success", duration);
                    Ok(InsertOutcome::Overlap)
                }
                _ => {
                    metrics::record_db_query("insert_booking", "error", duration);
                    Err(FacilityError::Database(format!(
                        "Failed to insert booking: {}",
                        e
                    )))
                }
            },
        }
    }

    /// Earliest booking for `(room, date)` whose `[start, end)` intersects
    /// the given interval.
    #[instrument(skip_all, name = "facility.repo.find_conflict", fields(room = %room, date = %date))]
    pub async fn find_conflict(
        pool: &PgPool,
        room: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Option<Booking>, FacilityError> {
        let start = Instant::now();

        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE room = $1
              AND booking_date = $2
              AND start_time < $4
              AND end_time > $3
            ORDER BY start_time
            LIMIT 1
            "#
        );

        let row: Option<BookingRow> = sqlx::query_as(&query)
            .bind(room)
            .bind(date)
            .bind(start_time)
            .bind(end_time)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                metrics::record_db_query("find_conflict", "error", start.elapsed());
                FacilityError::Database(format!("Failed to query overlapping bookings: {}", e))
            })?;

        metrics::record_db_query("find_conflict", "success", start.elapsed());

        Ok(row.map(Booking::from))
    }

    /// List bookings, optionally filtered by date and/or room.
    ///
    /// Ordered by date then start time.
    #[instrument(skip_all, name = "facility.repo.list_bookings")]
    pub async fn list(
        pool: &PgPool,
        date: Option<NaiveDate>,
        room: Option<&str>,
    ) -> Result<Vec<Booking>, FacilityError> {
        let start = Instant::now();

        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::date IS NULL OR booking_date = $1)
              AND ($2::text IS NULL OR room = $2)
            ORDER BY booking_date, start_time
            "#
        );

        let rows: Vec<BookingRow> = sqlx::query_as(&query)
            .bind(date)
            .bind(room)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                metrics::record_db_query("list_bookings", "error", start.elapsed());
                FacilityError::Database(format!("Failed to list bookings: {}", e))
            })?;

        metrics::record_db_query("list_bookings", "success", start.elapsed());

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    /// Today's bookings for one room, ordered by start time.
    #[instrument(skip_all, name = "facility.repo.bookings_for_day", fields(room = %room, date = %date))]
    pub async fn bookings_for_day(
        pool: &PgPool,
        room: &str,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, FacilityError> {
        Self::list(pool, Some(date), Some(room)).await
    }

    /// Fetch a booking by identifier.
    #[instrument(skip_all, name = "facility.repo.get_booking", fields(booking_id = %booking_id))]
    pub async fn get_by_id(
        pool: &PgPool,
        booking_id: &str,
    ) -> Result<Option<Booking>, FacilityError> {
        let start = Instant::now();

        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1");

        let row: Option<BookingRow> = sqlx::query_as(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                metrics::record_db_query("get_booking", "error", start.elapsed());
                FacilityError::Database(format!("Failed to fetch booking: {}", e))
            })?;

        metrics::record_db_query("get_booking", "success", start.elapsed());

        Ok(row.map(Booking::from))
    }

    /// Delete a booking. Returns `false` when no row matched.
    #[instrument(skip_all, name = "facility.repo.delete_booking", fields(booking_id = %booking_id))]
    pub async fn delete(pool: &PgPool, booking_id: &str) -> Result<bool, FacilityError> {
        let start = Instant::now();

        let result = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(pool)
            .await
            .map_err(|e| {
                metrics::record_db_query("delete_booking", "error", start.elapsed());
                FacilityError::Database(format!("Failed to delete booking: {}", e))
            })?;

        metrics::record_db_query("delete_booking", "success", start.elapsed());

        Ok(result.rows_affected() > 0)
    }

    /// Stamp `first_check_in` if it is still unset.
    ///
    /// Returns the stamped instant when this call set it, `None` when an
    /// earlier verification already had.
    #[instrument(skip_all, name = "facility.repo.stamp_first_check_in", fields(booking_id = %booking_id))]
    pub async fn stamp_first_check_in(
        pool: &PgPool,
        booking_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, FacilityError> {
        let start = Instant::now();

        let stamped: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            UPDATE bookings
            SET first_check_in = $2
            WHERE booking_id = $1
              AND first_check_in IS NULL
            RETURNING first_check_in
            "#,
        )
        .bind(booking_id)
        .bind(at)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("stamp_first_check_in", "error", start.elapsed());
            FacilityError::Database(format!("Failed to stamp first check-in: {}", e))
        })?;

        metrics::record_db_query("stamp_first_check_in", "success", start.elapsed());

        Ok(stamped.map(|(at,)| at))
    }

    /// Rewrite stored room names that still carry the UI marker.
    ///
    /// A row is left untouched when its cleaned name would be empty or
    /// would put it in conflict with another booking for the same room and
    /// date. Those rows are reported back instead of failing the pass.
    #[instrument(skip_all, name = "facility.repo.normalize_stored_rooms")]
    pub async fn normalize_stored_rooms(pool: &PgPool) -> Result<RoomRepair, FacilityError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            UPDATE bookings AS b
            SET room = btrim(regexp_replace(b.room, '\s*▼\s*', '', 'g'))
            WHERE b.room LIKE '%▼%'
              AND btrim(regexp_replace(b.room, '\s*▼\s*', '', 'g')) <> ''
              AND NOT EXISTS (
                  SELECT 1 FROM bookings AS other
                  WHERE other.booking_id <> b.booking_id
                    AND btrim(regexp_replace(other.room, '\s*▼\s*', '', 'g'))
                        = btrim(regexp_replace(b.room, '\s*▼\s*', '', 'g'))
                    AND other.booking_date = b.booking_date
                    AND other.start_time < b.end_time
                    AND other.end_time > b.start_time
              )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("normalize_stored_rooms", "error", start.elapsed());
            FacilityError::Database(format!("Failed to normalize room names: {}", e))
        })?;

        let skipped: Vec<(String,)> = sqlx::query_as(
            "SELECT booking_id FROM bookings WHERE room LIKE '%▼%' ORDER BY booking_id",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| {
            metrics::record_db_query("normalize_stored_rooms", "error", start.elapsed());
            FacilityError::Database(format!("Failed to list unnormalized rooms: {}", e))
        })?;

        metrics::record_db_query("normalize_stored_rooms", "success", start.elapsed());

        Ok(RoomRepair {
            updated: result.rows_affected(),
            skipped: skipped.into_iter().map(|(id,)| id).collect(),
        })
    }
}

/// SQLSTATE code of a database error, if any.
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}
