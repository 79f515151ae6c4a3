use chrono::{DateTime, Duration, Utc};

/// Wall-clock source for session timestamps.
///
/// Only timestamps go through here (start, completion, manual elapsed time).
/// The countdown itself is driven by explicit ticks.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward. No effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Whole seconds between `since` and now, zero if `since` is in the future.
    #[must_use]
    pub fn elapsed_secs(&self, since: DateTime<Utc>) -> u64 {
        let secs = (self.now() - since).num_seconds();
        u64::try_from(secs).unwrap_or(0)
    }
}

/// Renders a second count as `mm:ss` (minutes are not wrapped at an hour).
#[must_use]
pub fn format_countdown(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_counts_whole_seconds() {
        let start = fixed_now();
        let mut clock = fixed_clock();
        clock.advance(Duration::milliseconds(90_900));
        assert_eq!(clock.elapsed_secs(start), 90);
    }

    #[test]
    fn elapsed_never_negative() {
        let clock = fixed_clock();
        assert_eq!(clock.elapsed_secs(fixed_now() + Duration::seconds(5)), 0);
    }

    #[test]
    fn system_clock_ignores_advance() {
        let mut clock = Clock::System;
        clock.advance(Duration::days(1));
        assert!(matches!(clock, Clock::System));
    }

    #[test]
    fn countdown_format() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(125), "02:05");
        assert_eq!(format_countdown(3_600), "60:00");
    }
}
