//! Audio binding for the unit currently on screen.
//!
//! The controller never plays anything itself. It tracks which resource is
//! bound, hands out commands for the media backend to execute, and derives
//! its status purely from the events the backend reports back. Every binding
//! gets a fresh generation number so events and resolutions that belong to a
//! previous unit can be recognized and dropped.

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use exam_core::model::AudioRef;

use crate::error::AudioError;

//
// ─── RESOLUTION SEAM ───────────────────────────────────────────────────────────
//

/// Turns an opaque audio reference into something playable.
///
/// Implementations may merge several clips into one stream; the engine only
/// sees the final URL or a failure.
#[async_trait]
pub trait AudioResolver: Send + Sync {
    async fn resolve(&self, audio_ref: &AudioRef) -> Result<Url, AudioError>;
}

/// Resolves references relative to a fixed base URL.
#[derive(Debug, Clone)]
pub struct BaseUrlResolver {
    base: Url,
}

impl BaseUrlResolver {
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

#[async_trait]
impl AudioResolver for BaseUrlResolver {
    async fn resolve(&self, audio_ref: &AudioRef) -> Result<Url, AudioError> {
        let raw = audio_ref.as_str().trim();
        if raw.is_empty() {
            return Err(AudioError::Unresolved(audio_ref.to_string()));
        }
        self.base
            .join(raw)
            .map_err(|_| AudioError::InvalidUrl(raw.to_string()))
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioStatus {
    /// Nothing bound (unit without audio, or detached).
    Idle,
    /// Waiting for resolution or media metadata.
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    /// Play controls are disabled for this unit only.
    Unavailable(AudioError),
}

/// Signals reported by the media backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    Loaded { duration_secs: f64 },
    Played,
    Paused,
    Ended,
    TimeUpdate { position_secs: f64 },
    Failed(String),
}

/// Instructions for the media backend, stamped with the binding they target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCommand {
    /// Load `url` into a fresh element; never reuse the previous buffer.
    Load { generation: u64, url: Url },
    Play { generation: u64 },
    Pause { generation: u64 },
}

/// Proof that a resolution was requested for a particular binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioLoadTicket {
    generation: u64,
    audio_ref: AudioRef,
}

impl AudioLoadTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn audio_ref(&self) -> &AudioRef {
        &self.audio_ref
    }
}

#[derive(Debug, Clone)]
pub struct AudioController {
    generation: u64,
    audio_ref: Option<AudioRef>,
    source: Option<Url>,
    status: AudioStatus,
    position_secs: f64,
    duration_secs: Option<f64>,
}

impl Default for AudioController {
    fn default() -> Self {
        Self {
            generation: 0,
            audio_ref: None,
            source: None,
            status: AudioStatus::Idle,
            position_secs: 0.0,
            duration_secs: None,
        }
    }
}

impl AudioController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset playback and bind the next unit's audio, if any.
    ///
    /// Returns the ticket the caller must use to report the resolution.
    pub fn rebind(&mut self, audio_ref: Option<AudioRef>) -> Option<AudioLoadTicket> {
        self.generation += 1;
        self.source = None;
        self.position_secs = 0.0;
        self.duration_secs = None;
        self.status = if audio_ref.is_some() {
            AudioStatus::Loading
        } else {
            AudioStatus::Idle
        };
        self.audio_ref = audio_ref;
        debug!(generation = self.generation, audio = ?self.audio_ref, "audio rebound");

        self.audio_ref.clone().map(|audio_ref| AudioLoadTicket {
            generation: self.generation,
            audio_ref,
        })
    }

    /// Drop the binding entirely; any late events are ignored.
    pub fn detach(&mut self) {
        self.rebind(None);
    }

    /// Apply the result of resolving `ticket`.
    ///
    /// Returns the load command for the backend when the resolution is still
    /// current and succeeded.
    pub fn resolved(
        &mut self,
        ticket: &AudioLoadTicket,
        result: Result<Url, AudioError>,
    ) -> Option<AudioCommand> {
        if ticket.generation != self.generation || self.status != AudioStatus::Loading {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping stale audio resolution"
            );
            return None;
        }
        match result {
            Ok(url) => {
                self.source = Some(url.clone());
                Some(AudioCommand::Load {
                    generation: self.generation,
                    url,
                })
            }
            Err(err) => {
                warn!(audio = %ticket.audio_ref, error = %err, "audio unavailable");
                self.status = AudioStatus::Unavailable(err);
                None
            }
        }
    }

    /// Feed a backend event. Returns false when the event was stale or did
    /// not apply to the current status.
    pub fn handle(&mut self, generation: u64, event: AudioEvent) -> bool {
        if generation != self.generation || self.audio_ref.is_none() {
            debug!(generation, current = self.generation, ?event, "ignoring stale media event");
            return false;
        }
        if matches!(self.status, AudioStatus::Unavailable(_)) {
            return false;
        }

        match event {
            AudioEvent::Loaded { duration_secs } => {
                if self.status != AudioStatus::Loading || self.source.is_none() {
                    return false;
                }
                self.duration_secs = Some(duration_secs);
                self.status = AudioStatus::Ready;
            }
            AudioEvent::Played => {
                if self.status == AudioStatus::Loading {
                    return false;
                }
                self.status = AudioStatus::Playing;
            }
            AudioEvent::Paused => {
                if self.status != AudioStatus::Playing {
                    return false;
                }
                self.status = AudioStatus::Paused;
            }
            AudioEvent::Ended => {
                if let Some(duration) = self.duration_secs {
                    self.position_secs = duration;
                }
                self.status = AudioStatus::Ended;
            }
            AudioEvent::TimeUpdate { position_secs } => {
                self.position_secs = position_secs.max(0.0);
            }
            AudioEvent::Failed(reason) => {
                warn!(audio = ?self.audio_ref, %reason, "media failed");
                self.status = AudioStatus::Unavailable(AudioError::Media(reason));
            }
        }
        true
    }

    /// Ask the backend to start playback. `None` when nothing playable is bound.
    #[must_use]
    pub fn play(&self) -> Option<AudioCommand> {
        matches!(
            self.status,
            AudioStatus::Ready | AudioStatus::Paused | AudioStatus::Ended
        )
        .then_some(AudioCommand::Play {
            generation: self.generation,
        })
    }

    #[must_use]
    pub fn pause(&self) -> Option<AudioCommand> {
        (self.status == AudioStatus::Playing).then_some(AudioCommand::Pause {
            generation: self.generation,
        })
    }

    #[must_use]
    pub fn status(&self) -> &AudioStatus {
        &self.status
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn audio_ref(&self) -> Option<&AudioRef> {
        self.audio_ref.as_ref()
    }

    #[must_use]
    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.status == AudioStatus::Playing
    }

    #[must_use]
    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    #[must_use]
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Play/pause controls are usable.
    #[must_use]
    pub fn controls_enabled(&self) -> bool {
        !matches!(
            self.status,
            AudioStatus::Idle | AudioStatus::Loading | AudioStatus::Unavailable(_)
        )
    }
}
