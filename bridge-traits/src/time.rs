//! Injectable wall clock.
//!
//! The outbox stamps rows with Unix seconds (enqueue time, last submission
//! attempt). Going through [`Clock`] lets tests pin those values.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Seconds since the Unix epoch, the unit persisted by the outbox.
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Reads the host's system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_unix_timestamp_follows_now() {
        let frozen = Frozen(Utc.with_ymd_and_hms(2012, 6, 1, 20, 0, 0).unwrap());
        assert_eq!(frozen.unix_timestamp(), 1_338_580_800);
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        let before = Utc::now().timestamp();
        let stamp = SystemClock.unix_timestamp();
        assert!(stamp >= before);
    }
}
