use time::{OffsetDateTime, UtcOffset};

/// Source of the current instant for every time-dependent rule.
pub trait Clock: Send + Sync {
    /// Current instant in UTC, truncated to whole seconds.
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        truncate_to_seconds(OffsetDateTime::now_utc())
    }
}

/// Instants are persisted as text, so sub-second parts would break ordering.
pub fn truncate_to_seconds(instant: OffsetDateTime) -> OffsetDateTime {
    instant
        .to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .unwrap_or(instant)
}

pub fn truncate_to_minute(instant: OffsetDateTime) -> OffsetDateTime {
    let instant = truncate_to_seconds(instant);
    instant.replace_second(0).unwrap_or(instant)
}

#[cfg(any(test, feature = "mock"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "mock"))]
mod manual {
    use std::sync::Mutex;

    use time::{Duration, OffsetDateTime};

    use super::{Clock, truncate_to_seconds};

    /// A clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<OffsetDateTime>,
    }

    impl ManualClock {
        pub fn new(now: OffsetDateTime) -> Self {
            Self {
                now: Mutex::new(truncate_to_seconds(now)),
            }
        }

        pub fn set(&self, now: OffsetDateTime) {
            *self.now.lock().unwrap() = truncate_to_seconds(now);
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = truncate_to_seconds(*now + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> OffsetDateTime {
            *self.now.lock().unwrap()
        }
    }
}
