//! Wall clock used for challenge seeds and keep-alive time fields

use chrono::Utc;

/// Source of the current Unix time
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn unix_secs(&self) -> u64;
}

/// [`Clock`] backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_secs(&self) -> u64 {
        // Clocks set before 1970 report zero rather than wrapping.
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.unix_secs() > 1_577_836_800);
    }

    #[test]
    fn test_mock_clock() {
        let mut clock = MockClock::new();
        clock.expect_unix_secs().return_const(42u64);

        assert_eq!(clock.unix_secs(), 42);
    }
}
