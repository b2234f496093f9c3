//! Source of "now" for time-window decisions.
//!
//! Handlers read the current instant through [`Clock`] so tests can pin it.

use chrono::{DateTime, Utc};

/// Supplies the current UTC instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock module for testing.
pub mod mock {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock pinned to an instant until moved explicitly.
    #[derive(Debug)]
    pub struct FixedClock {
        millis: AtomicI64,
    }

    impl FixedClock {
        pub fn new(at: DateTime<Utc>) -> Self {
            Self {
                millis: AtomicI64::new(at.timestamp_millis()),
            }
        }

        /// Move the clock to `at`.
        pub fn set(&self, at: DateTime<Utc>) {
            self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
        }

        /// Move the clock forward by `by`.
        pub fn advance(&self, by: Duration) {
            self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            let millis = self.millis.load(Ordering::SeqCst);
            DateTime::from_timestamp_millis(millis).unwrap_or_default()
        }
    }
}
