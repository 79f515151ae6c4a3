use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("duration override must be > 0 seconds")]
    InvalidDuration,

    #[error("tick interval must be between 10 and 60000 ms")]
    InvalidTickInterval,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Knobs for a single test attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    duration_override_secs: Option<u32>,
    tick_interval_ms: u64,
    auto_play_audio: bool,
    finish_on_last_next: bool,
}

impl Default for SessionSettings {
    /// Document duration, one-second ticks, manual audio start, and `next()`
    /// on the final unit finishes the attempt.
    fn default() -> Self {
        Self {
            duration_override_secs: None,
            tick_interval_ms: 1_000,
            auto_play_audio: false,
            finish_on_last_next: true,
        }
    }
}

impl SessionSettings {
    /// # Errors
    ///
    /// Returns `SettingsError` when the override is zero or the tick interval
    /// is out of range.
    pub fn new(
        duration_override_secs: Option<u32>,
        tick_interval_ms: u64,
        auto_play_audio: bool,
        finish_on_last_next: bool,
    ) -> Result<Self, SettingsError> {
        if duration_override_secs == Some(0) {
            return Err(SettingsError::InvalidDuration);
        }
        if !(10..=60_000).contains(&tick_interval_ms) {
            return Err(SettingsError::InvalidTickInterval);
        }
        Ok(Self {
            duration_override_secs,
            tick_interval_ms,
            auto_play_audio,
            finish_on_last_next,
        })
    }

    /// Learner-chosen duration, if any; otherwise the document's own.
    #[must_use]
    pub fn duration_override_secs(&self) -> Option<u32> {
        self.duration_override_secs
    }

    #[must_use]
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    #[must_use]
    pub fn auto_play_audio(&self) -> bool {
        self.auto_play_audio
    }

    /// When false, `next()` on the last unit is a no-op instead of finishing.
    #[must_use]
    pub fn finish_on_last_next(&self) -> bool {
        self.finish_on_last_next
    }

    /// Effective countdown length for a document of `document_secs`.
    #[must_use]
    pub fn resolve_duration(&self, document_secs: u32) -> u32 {
        self.duration_override_secs.unwrap_or(document_secs)
    }
}
