use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::ports::outbound::TimeSource;

/// Default time source using the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug)]
pub struct FixedTimeSource {
    now: Mutex<DateTime<Utc>>,
}

impl FixedTimeSource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_time_source() {
        let start = Utc.with_ymd_and_hms(2018, 6, 1, 12, 0, 0).unwrap();
        let clock = FixedTimeSource::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), start + Duration::seconds(90));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_system_time_source_is_recent() {
        let now = SystemTimeSource.now();
        assert!(now.timestamp() > 1_500_000_000);
    }
}
