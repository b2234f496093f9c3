//! Common error types for facility dashboard components.

use thiserror::Error;

/// Errors produced when parsing civil clock times and dates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    /// Input was not of the form `HH:MM`
    #[error("Invalid time format, expected HH:MM: {0}")]
    Format(String),

    /// Hour or minute outside the 24-hour clock
    #[error("Time out of range: {0}")]
    OutOfRange(String),

    /// Input was not of the form `YYYY-MM-DD`
    #[error("Invalid date format, expected YYYY-MM-DD: {0}")]
    Date(String),
}

/// Result type alias using `TimeParseError`
pub type Result<T> = std::result::Result<T, TimeParseError>;
