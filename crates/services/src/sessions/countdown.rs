/// Result of a single countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining_secs: u32 },
    /// This tick took the countdown to zero.
    Expired,
    /// The countdown had already stopped; nothing changed.
    Stopped,
}

const MILLIS_PER_SEC: u64 = 1_000;

/// Countdown for a session, decremented by a fixed step per tick.
///
/// Each tick stands for `step_ms` of wall-clock time, so a shorter tick
/// interval refreshes the display more often without shortening the test.
/// Remaining time never increases. Once stopped (by expiry or because the
/// session finished some other way) further ticks change nothing.
#[derive(Debug, Clone)]
pub struct Countdown {
    duration_secs: u32,
    remaining_ms: u64,
    step_ms: u64,
    stopped: bool,
}

impl Countdown {
    /// One-second ticks.
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self::with_step(duration_secs, MILLIS_PER_SEC)
    }

    /// A zero step is treated as one millisecond.
    #[must_use]
    pub fn with_step(duration_secs: u32, step_ms: u64) -> Self {
        Self {
            duration_secs,
            remaining_ms: u64::from(duration_secs) * MILLIS_PER_SEC,
            step_ms: step_ms.max(1),
            stopped: false,
        }
    }

    pub fn tick(&mut self) -> Tick {
        if self.stopped {
            return Tick::Stopped;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(self.step_ms);
        if self.remaining_ms == 0 {
            self.stopped = true;
            return Tick::Expired;
        }
        Tick::Running {
            remaining_secs: self.remaining_secs(),
        }
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Whole seconds left, rounded up so `00:00` only shows at expiry.
    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        u32::try_from(self.remaining_ms.div_ceil(MILLIS_PER_SEC)).unwrap_or(u32::MAX)
    }

    /// Seconds consumed by ticks so far.
    #[must_use]
    pub fn consumed_secs(&self) -> u32 {
        self.duration_secs.saturating_sub(self.remaining_secs())
    }
}
