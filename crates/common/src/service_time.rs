//! Fixed service-time convention.
//!
//! The deployment runs on a single civil day defined by a fixed UTC offset.
//! "Today", "now", stored booking dates/times, and log date filters are all
//! interpreted through the same [`ServiceTimeZone`]. Instants (creation and
//! check-in timestamps) stay in UTC.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use std::fmt;

/// Default offset: UTC+07:00.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

/// Smallest accepted offset (UTC-12:00).
pub const MIN_UTC_OFFSET_MINUTES: i32 = -12 * 60;

/// Largest accepted offset (UTC+14:00).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// A fixed-offset zone used for every civil date/time computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimeZone {
    offset: FixedOffset,
}

impl ServiceTimeZone {
    /// Build a zone from an offset east of UTC in minutes.
    ///
    /// Returns `None` outside `[-720, 840]`.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        if !(MIN_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&minutes) {
            return None;
        }
        FixedOffset::east_opt(minutes * 60).map(|offset| Self { offset })
    }

    /// UTC itself.
    #[must_use]
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Offset east of UTC in minutes.
    #[must_use]
    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Civil date and time of `instant` in this zone.
    #[must_use]
    pub fn to_civil(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    /// Civil date of `instant` in this zone.
    #[must_use]
    pub fn today(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_civil(instant).date()
    }

    /// UTC instant of a civil date/time in this zone.
    #[must_use]
    pub fn to_instant(&self, civil: NaiveDateTime) -> DateTime<Utc> {
        let utc_naive = civil - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc_naive)
    }

    /// Half-open UTC range `[date 00:00, date+1 00:00)` for a civil date.
    #[must_use]
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.to_instant(date.and_time(NaiveTime::MIN));
        (start, start + Duration::days(1))
    }
}

impl Default for ServiceTimeZone {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(Self::utc)
    }
}

impl fmt::Display for ServiceTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UTC{}", self.offset)
    }
}
