use chrono::{DateTime, Duration, Utc};
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

use exam_core::model::{AnswerKey, SessionId, SessionSettings, TestDocument};
use exam_core::{Clock, Navigator, NormalizedTest, Position, Step, Unit, normalize};

use super::answers::AnswerStore;
use super::audio::{AudioCommand, AudioController, AudioEvent, AudioLoadTicket};
use super::countdown::{Countdown, Tick};
use super::progress::SessionProgress;
use super::submission::{
    Completion, CompletionTrigger, Delivery, OnComplete, Phase, SubmissionCoordinator,
    SubmissionPayload, time_spent_secs,
};
use super::view::{AudioView, QuestionView, UnitView};
use crate::error::{AudioError, SessionError};

//
// ─── NAVIGATION OUTCOME ────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// A new unit is current; its audio binding has already been reset.
    Moved(Position),
    /// Boundary; nothing changed.
    Stayed,
    /// `next()` on the last unit finished the session.
    Finished(Completion),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner attempt at a loaded test.
///
/// Single owner of position, answers, countdown and audio binding. All three
/// event sources (learner input, ticks, media callbacks) go through `&mut self`
/// and every mutating entry point checks the phase first, so nothing changes
/// after completion.
pub struct SessionService {
    id: SessionId,
    test: NormalizedTest,
    settings: SessionSettings,
    clock: Clock,
    navigator: Navigator,
    answers: AnswerStore,
    audio: AudioController,
    pending_load: Option<AudioLoadTicket>,
    countdown: Countdown,
    coordinator: SubmissionCoordinator,
    /// Park the completion callback in `parked` instead of running it inline.
    defer_delivery: bool,
    parked: Option<Delivery>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    active: bool,
}

impl SessionService {
    /// Start a session with default settings and the system clock.
    ///
    /// `on_complete` is invoked exactly once, when the session completes.
    /// Behind a [`SessionHandle`](super::SessionHandle) it runs after the
    /// session lock is released.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for a document without parts.
    pub fn start(doc: &TestDocument, on_complete: OnComplete) -> Result<Self, SessionError> {
        Self::start_with(doc, SessionSettings::default(), Clock::default(), on_complete)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Empty` for a document without parts.
    pub fn start_with(
        doc: &TestDocument,
        settings: SessionSettings,
        clock: Clock,
        on_complete: OnComplete,
    ) -> Result<Self, SessionError> {
        let test = normalize(doc);
        let navigator = Navigator::new(&test).ok_or(SessionError::Empty)?;
        let duration = settings.resolve_duration(test.duration_secs);
        if duration == 0 {
            return Err(SessionError::Document(
                exam_core::model::DocumentError::InvalidDuration,
            ));
        }

        let step_ms = settings.tick_interval_ms();
        let mut session = Self {
            id: SessionId::generate(),
            test,
            settings,
            clock,
            navigator,
            answers: AnswerStore::new(),
            audio: AudioController::new(),
            pending_load: None,
            countdown: Countdown::with_step(duration, step_ms),
            coordinator: SubmissionCoordinator::new(on_complete),
            defer_delivery: false,
            parked: None,
            started_at: clock.now(),
            completed_at: None,
            active: true,
        };
        info!(
            session = %session.id,
            test = %session.test.test_id,
            parts = session.test.parts.len(),
            questions = session.test.total_questions,
            duration,
            "session started"
        );
        session.enter_current_unit();
        Ok(session)
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` after completion.
    pub fn next(&mut self) -> Result<Navigation, SessionError> {
        self.ensure_running("next")?;
        match self.navigator.next() {
            Step::Moved { to, .. } => Ok(self.entered(to)),
            Step::Stay => Ok(Navigation::Stayed),
            Step::End if self.settings.finish_on_last_next() => {
                Ok(Navigation::Finished(self.complete(CompletionTrigger::Manual)?))
            }
            Step::End => Ok(Navigation::Stayed),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` after completion.
    pub fn back(&mut self) -> Result<Navigation, SessionError> {
        self.ensure_running("back")?;
        match self.navigator.back() {
            Step::Moved { to, .. } => Ok(self.entered(to)),
            Step::Stay | Step::End => Ok(Navigation::Stayed),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` after completion.
    pub fn jump_to_part(&mut self, part: usize) -> Result<Navigation, SessionError> {
        self.ensure_running("jump_to_part")?;
        match self.navigator.jump_to_part(part) {
            Step::Moved { to, .. } => Ok(self.entered(to)),
            Step::Stay | Step::End => Ok(Navigation::Stayed),
        }
    }

    fn entered(&mut self, to: Position) -> Navigation {
        self.enter_current_unit();
        Navigation::Moved(to)
    }

    /// Rebind audio for the unit the navigator now points at. Runs before the
    /// new unit is reported to anyone.
    fn enter_current_unit(&mut self) {
        let position = self.navigator.position();
        let Some(unit) = self.test.unit(position) else {
            warn!(?position, "navigator points outside the test");
            self.pending_load = self.audio.rebind(None);
            return;
        };
        if unit.is_unsupported() {
            warn!(part = position.part, "unsupported part shown as placeholder");
        }
        let audio = unit.audio.clone();
        self.pending_load = self.audio.rebind(audio);
        debug!(
            part = position.part,
            unit = ?position.sub_unit,
            generation = self.audio.generation(),
            "unit changed"
        );
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Store `value` for question `index` of the current unit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` after completion and
    /// `SessionError::UnknownQuestion` when the unit has no such question.
    pub fn answer(&mut self, index: usize, value: &str) -> Result<(), SessionError> {
        self.ensure_running("answer")?;
        let key = self.current_key(index)?;
        self.answers.set(key, value);
        Ok(())
    }

    /// # Errors
    ///
    /// Same as [`SessionService::answer`].
    pub fn clear_answer(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_running("clear_answer")?;
        let key = self.current_key(index)?;
        self.answers.clear(key);
        Ok(())
    }

    /// Select `value`, or clear it when it is already selected.
    ///
    /// # Errors
    ///
    /// Same as [`SessionService::answer`].
    pub fn toggle_answer(&mut self, index: usize, value: &str) -> Result<String, SessionError> {
        self.ensure_running("toggle_answer")?;
        let key = self.current_key(index)?;
        Ok(self.answers.toggle(key, value).to_string())
    }

    #[must_use]
    pub fn answer_for(&self, key: &AnswerKey) -> Option<&str> {
        self.answers.get(key)
    }

    fn current_key(&self, index: usize) -> Result<AnswerKey, SessionError> {
        self.current_unit()
            .and_then(|unit| unit.question(index))
            .map(|q| q.key.clone())
            .ok_or(SessionError::UnknownQuestion { index })
    }

    //
    // ─── TIME & COMPLETION ─────────────────────────────────────────────────────
    //

    /// Advance the countdown by one tick interval; expiry completes the
    /// session.
    ///
    /// Ticks after completion or teardown are no-ops.
    pub fn tick(&mut self) -> Tick {
        if !self.active || self.is_complete() {
            return Tick::Stopped;
        }
        let tick = self.countdown.tick();
        if tick == Tick::Expired {
            self.submit(CompletionTrigger::Timeout);
        }
        tick
    }

    /// Explicit "finish" from the learner.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Inactive` after teardown.
    pub fn finish(&mut self) -> Result<Completion, SessionError> {
        self.complete(CompletionTrigger::Manual)
    }

    /// Complete the session. Only the first call submits; later calls report
    /// `Completion::AlreadyCompleted`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Inactive` after teardown; a torn-down session
    /// never submits.
    pub fn complete(&mut self, trigger: CompletionTrigger) -> Result<Completion, SessionError> {
        if !self.active {
            return Err(SessionError::Inactive);
        }
        Ok(self.submit(trigger))
    }

    fn submit(&mut self, trigger: CompletionTrigger) -> Completion {
        self.countdown.stop();

        let now = self.clock.now();
        let elapsed = self.clock.elapsed_secs(self.started_at);
        let duration = self.countdown.duration_secs();
        let (test_id, session_id) = (self.test.test_id, self.id);
        let answers = &self.answers;

        let (completion, delivery) = self.coordinator.complete(trigger, || SubmissionPayload {
            test_id,
            session_id,
            answers: answers.snapshot(),
            time_spent_seconds: time_spent_secs(trigger, duration, elapsed),
            trigger,
            completed_at: now,
        });
        if matches!(completion, Completion::Submitted { .. }) {
            self.completed_at = Some(now);
            self.pending_load = None;
        }
        if let Some(delivery) = delivery {
            if self.defer_delivery {
                self.parked = Some(delivery);
            } else {
                delivery.deliver();
            }
        }
        completion
    }

    /// Park completion callbacks until [`SessionService::take_delivery`]
    /// instead of running them inside `complete`.
    pub(crate) fn defer_delivery(&mut self) {
        self.defer_delivery = true;
    }

    pub(crate) fn take_delivery(&mut self) -> Option<Delivery> {
        self.parked.take()
    }

    /// Leave the session: stop the countdown, drop audio, and refuse any
    /// later completion.
    pub fn teardown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.countdown.stop();
        self.audio.detach();
        self.pending_load = None;
        debug!(session = %self.id, "session torn down");
    }

    /// Moves a fixed clock forward; no effect on the system clock.
    pub fn advance_clock(&mut self, delta: Duration) {
        self.clock.advance(delta);
    }

    //
    // ─── AUDIO ─────────────────────────────────────────────────────────────────
    //

    /// Take the resolution request for the current unit's audio, if one is
    /// outstanding.
    pub fn take_audio_load(&mut self) -> Option<AudioLoadTicket> {
        if !self.active || self.is_complete() {
            return None;
        }
        self.pending_load.take()
    }

    /// Apply a resolution that finished after an asynchronous gap.
    ///
    /// Re-checks liveness, phase and binding generation, since the session
    /// may have moved on or completed while the resolver ran.
    pub fn apply_audio_resolution(
        &mut self,
        ticket: &AudioLoadTicket,
        result: Result<Url, AudioError>,
    ) -> Option<AudioCommand> {
        if !self.active || self.is_complete() {
            debug!(generation = ticket.generation(), "resolution arrived after completion");
            return None;
        }
        self.audio.resolved(ticket, result)
    }

    /// Feed a media backend event. Returns a follow-up command (auto-play).
    pub fn media_event(&mut self, generation: u64, event: AudioEvent) -> Option<AudioCommand> {
        if !self.active || self.is_complete() {
            return None;
        }
        let loaded = matches!(event, AudioEvent::Loaded { .. });
        let applied = self.audio.handle(generation, event);
        if applied && loaded && self.settings.auto_play_audio() {
            return self.audio.play();
        }
        None
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` after completion.
    pub fn play(&mut self) -> Result<Option<AudioCommand>, SessionError> {
        self.ensure_running("play")?;
        Ok(self.audio.play())
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` after completion.
    pub fn pause(&mut self) -> Result<Option<AudioCommand>, SessionError> {
        self.ensure_running("pause")?;
        Ok(self.audio.pause())
    }

    #[must_use]
    pub fn audio(&self) -> &AudioController {
        &self.audio
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn test(&self) -> &NormalizedTest {
        &self.test
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.navigator.position()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.coordinator.phase()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase() == Phase::Completed
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Completion> {
        self.coordinator.outcome()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn current_unit(&self) -> Option<&Unit> {
        self.test.unit(self.navigator.position())
    }

    /// Absolute number of the first question on the current unit.
    #[must_use]
    pub fn current_question_number(&self) -> usize {
        self.current_unit().map_or(1, |u| u.first_number)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let unit = self.current_unit();
        SessionProgress {
            current_number: self.current_question_number(),
            question_range: unit.and_then(Unit::question_range),
            total_questions: self.test.total_questions,
            answered: self.answers.answered_count(),
            remaining_secs: self.countdown.remaining_secs(),
            part_index: self.navigator.position().part,
            part_count: self.navigator.part_count(),
            phase: self.phase(),
        }
    }

    /// Everything needed to render the current unit.
    #[must_use]
    pub fn view(&self) -> Option<UnitView<'_>> {
        let position = self.navigator.position();
        let unit = self.test.unit(position)?;
        let part = self.test.part(position.part)?;
        Some(UnitView {
            position,
            kind: unit.kind,
            part_title: part.title.as_deref(),
            unit_id: unit.unit_id,
            examples: &unit.examples,
            questions: unit
                .questions
                .iter()
                .map(|q| QuestionView {
                    key: &q.key,
                    number: q.number,
                    question: &q.question,
                    answer: self.answer_for(&q.key),
                })
                .collect(),
            audio: AudioView {
                status: self.audio.status(),
                is_playing: self.audio.is_playing(),
                position_secs: self.audio.position_secs(),
                duration_secs: self.audio.duration_secs(),
                controls_enabled: self.audio.controls_enabled(),
            },
        })
    }

    fn ensure_running(&self, action: &'static str) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::Inactive);
        }
        if self.is_complete() {
            return Err(SessionError::InvalidTransition { action });
        }
        Ok(())
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("id", &self.id)
            .field("test_id", &self.test.test_id)
            .field("position", &self.navigator.position())
            .field("remaining_secs", &self.countdown.remaining_secs())
            .field("clock_running", &!self.countdown.is_stopped())
            .field("answers", &self.answers.answered_count())
            .field("coordinator", &self.coordinator)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
