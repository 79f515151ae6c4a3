use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use exam_core::Clock;
use exam_core::model::{SessionSettings, TestDocument};

use super::audio::{AudioCommand, AudioResolver};
use super::countdown::Tick;
use super::service::SessionService;
use super::submission::OnComplete;
use crate::error::SessionError;

/// Shared, cloneable access to one running session.
///
/// Learner input, the timer task and media callbacks all lock the same
/// session, so their effects are serialized. No lock is held across an
/// await: the audio load drops it while the resolver runs and re-checks
/// the session afterwards. The completion callback runs after the lock is
/// released, so it may call back into the handle.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<SessionService>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    /// # Errors
    ///
    /// Returns `SessionError` when the document cannot back a session.
    pub fn start(
        doc: &TestDocument,
        settings: SessionSettings,
        clock: Clock,
        on_complete: OnComplete,
    ) -> Result<Self, SessionError> {
        let session = SessionService::start_with(doc, settings, clock, on_complete)?;
        Ok(Self::from_session(session))
    }

    #[must_use]
    pub fn from_session(mut session: SessionService) -> Self {
        session.defer_delivery();
        Self {
            session: Arc::new(Mutex::new(session)),
            timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionService) -> R) -> R {
        with_session(&self.session, f)
    }

    /// Start ticking the countdown on the tokio runtime. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn_timer(&self) {
        let mut slot = lock(&self.timer);
        if slot.is_some() {
            return;
        }
        let period = Duration::from_millis(self.with(|s| s.settings().tick_interval_ms()));
        let session = Arc::clone(&self.session);

        *slot = Some(tokio::spawn(async move {
            // Missed ticks fire in a burst so a stalled task catches up with
            // the wall clock instead of handing out extra time.
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                ticks.tick().await;
                let tick = with_session(&session, SessionService::tick);
                if !matches!(tick, Tick::Running { .. }) {
                    debug!(?tick, "timer stopped");
                    break;
                }
            }
        }));
    }

    /// Resolve the current unit's audio, if a resolution is outstanding.
    ///
    /// Returns the load command for the media backend, or `None` when there
    /// was nothing to load, it failed, or the session moved on meanwhile.
    pub async fn load_current_audio(&self, resolver: &dyn AudioResolver) -> Option<AudioCommand> {
        let ticket = self.with(SessionService::take_audio_load)?;
        let result = resolver.resolve(ticket.audio_ref()).await;
        self.with(|s| s.apply_audio_resolution(&ticket, result))
    }

    /// Stop the timer and detach the session. Later ticks, callbacks and
    /// completion requests have no effect.
    pub fn teardown(&self) {
        self.with(SessionService::teardown);
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.with(|s| s.is_complete())
    }
}

/// Lock, run `f`, unlock, then deliver a completion `f` may have caused.
fn with_session<R>(
    session: &Mutex<SessionService>,
    f: impl FnOnce(&mut SessionService) -> R,
) -> R {
    let (result, delivery) = {
        let mut guard = lock(session);
        let result = f(&mut *guard);
        (result, guard.take_delivery())
    };
    if let Some(delivery) = delivery {
        delivery.deliver();
    }
    result
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
