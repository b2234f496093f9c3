//! Civil clock-time helpers for booking and check-in logic.
//!
//! Times are `HH:MM` strings on a 24-hour clock with no timezone attached.
//! They are only meaningful against a single service day, see
//! [`crate::service_time::ServiceTimeZone`].
//!
//! Two interval conventions coexist on purpose:
//!
//! - Booking overlap uses half-open `[start, end)` intervals, so a booking
//!   ending at 10:00 does not collide with one starting at 10:00.
//! - The access window is closed `[start - allowance, end]`, so a scan at
//!   exactly the end minute is still admitted.

use crate::error::{Result, TimeParseError};
use chrono::{NaiveDate, NaiveTime, Timelike};

/// Date format for stored booking dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Clock format for stored booking times.
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse an `HH:MM` string into a [`NaiveTime`].
///
/// Single-digit hours (`9:05`) are accepted, minutes must have two digits.
///
/// # Errors
///
/// Returns [`TimeParseError::Format`] for non-numeric or mis-shaped input and
/// [`TimeParseError::OutOfRange`] when the hour or minute does not exist.
pub fn parse_hhmm(hhmm: &str) -> Result<NaiveTime> {
    let trimmed = hhmm.trim();
    let (hour_str, minute_str) = trimmed
        .split_once(':')
        .ok_or_else(|| TimeParseError::Format(hhmm.to_string()))?;

    let well_formed = (1..=2).contains(&hour_str.len())
        && minute_str.len() == 2
        && hour_str.bytes().all(|b| b.is_ascii_digit())
        && minute_str.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(TimeParseError::Format(hhmm.to_string()));
    }

    let hour: u32 = hour_str
        .parse()
        .map_err(|_| TimeParseError::Format(hhmm.to_string()))?;
    let minute: u32 = minute_str
        .parse()
        .map_err(|_| TimeParseError::Format(hhmm.to_string()))?;

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| TimeParseError::OutOfRange(hhmm.to_string()))
}

/// Parse a `YYYY-MM-DD` civil date.
///
/// # Errors
///
/// Returns [`TimeParseError::Date`] if the input is not a zero-padded
/// calendar date.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    let trimmed = date.trim();
    if trimmed.len() != 10 {
        return Err(TimeParseError::Date(date.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| TimeParseError::Date(date.to_string()))
}

/// Convert `HH:MM` to minutes since midnight (`hour * 60 + minute`).
///
/// # Errors
///
/// Propagates [`parse_hhmm`] failures.
pub fn to_minutes(hhmm: &str) -> Result<i64> {
    parse_hhmm(hhmm).map(minutes_of)
}

/// Minutes since midnight, seconds discarded.
#[must_use]
pub fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Whole seconds since midnight.
#[must_use]
pub fn seconds_of(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

/// Render a time as `HH:MM`.
#[must_use]
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Half-open interval overlap: `start_a < end_b && end_a > start_b`.
#[must_use]
pub fn overlaps<T: PartialOrd>(start_a: T, end_a: T, start_b: T, end_b: T) -> bool {
    start_a < end_b && end_a > start_b
}

/// Seconds from `now` until `end` on the same civil day, never negative.
#[must_use]
pub fn remaining_seconds(now: NaiveTime, end: NaiveTime) -> i64 {
    (seconds_of(end) - seconds_of(now)).max(0)
}

/// Where a clock minute falls relative to an [`AccessWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    /// Before the window opens; `wait_minutes` until it does.
    Early { wait_minutes: i64 },
    /// Inside the window (both bounds inclusive).
    Open,
    /// After the booking's end time.
    Closed,
}

/// Inclusive check-in window `[start - early_allowance, end]` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindow {
    opens_at: i64,
    closes_at: i64,
}

impl AccessWindow {
    /// Build the window for a booking's start/end with the given allowance.
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime, early_allowance_minutes: i64) -> Self {
        Self {
            opens_at: minutes_of(start) - early_allowance_minutes,
            closes_at: minutes_of(end),
        }
    }

    /// First admitted minute (may be negative for bookings near midnight).
    #[must_use]
    pub fn opens_at(&self) -> i64 {
        self.opens_at
    }

    /// Last admitted minute.
    #[must_use]
    pub fn closes_at(&self) -> i64 {
        self.closes_at
    }

    /// Classify `current_minutes` against the window.
    #[must_use]
    pub fn position(&self, current_minutes: i64) -> WindowPosition {
        if current_minutes < self.opens_at {
            WindowPosition::Early {
                wait_minutes: self.opens_at - current_minutes,
            }
        } else if current_minutes > self.closes_at {
            WindowPosition::Closed
        } else {
            WindowPosition::Open
        }
    }

    /// Whether `current_minutes` is inside the window.
    #[must_use]
    pub fn contains(&self, current_minutes: i64) -> bool {
        self.position(current_minutes) == WindowPosition::Open
    }
}

/// Serde adapter rendering [`NaiveTime`] as `HH:MM`.
///
/// Use with `#[serde(with = "common::time_window::hhmm")]`.
pub mod hhmm {
    use super::{format_hhmm, parse_hhmm};
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `HH:MM`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_hhmm(*time))
    }

    /// Deserialize from `HH:MM`.
    ///
    /// # Errors
    ///
    /// Fails when the string is not a valid clock time.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}
