use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use exam_core::model::{SessionId, TestId};

use super::answers::AnswerSnapshot;

/// What ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTrigger {
    Timeout,
    Manual,
}

impl CompletionTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionTrigger::Timeout => "timeout",
            CompletionTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    /// Terminal.
    Completed,
}

/// Everything handed to the grading side, exactly once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub test_id: TestId,
    pub session_id: SessionId,
    pub answers: AnswerSnapshot,
    pub time_spent_seconds: u32,
    pub trigger: CompletionTrigger,
    pub completed_at: DateTime<Utc>,
}

/// Outbound boundary: receives the payload of a completed session.
pub type OnComplete = Box<dyn FnOnce(SubmissionPayload) + Send>;

/// Result of a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// This request won the transition and the payload was delivered.
    Submitted {
        trigger: CompletionTrigger,
        time_spent_secs: u32,
    },
    /// Another trigger already completed the session; nothing was sent.
    AlreadyCompleted,
}

/// The taken callback together with its payload, ready to run.
///
/// Split from the transition so a caller holding a lock can release it
/// before the callback runs.
pub(crate) struct Delivery {
    callback: OnComplete,
    payload: SubmissionPayload,
}

impl Delivery {
    pub(crate) fn deliver(self) {
        (self.callback)(self.payload);
    }
}

/// Owns the `Running -> Completed` transition and the outbound callback.
pub(crate) struct SubmissionCoordinator {
    phase: Phase,
    on_complete: Option<OnComplete>,
    submitted: Option<Completion>,
}

impl SubmissionCoordinator {
    pub(crate) fn new(on_complete: OnComplete) -> Self {
        Self {
            phase: Phase::Running,
            on_complete: Some(on_complete),
            submitted: None,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn outcome(&self) -> Option<Completion> {
        self.submitted
    }

    /// Compare-and-set on the phase. Only the winning call builds the
    /// payload and receives the callback to deliver it with.
    pub(crate) fn complete(
        &mut self,
        trigger: CompletionTrigger,
        build: impl FnOnce() -> SubmissionPayload,
    ) -> (Completion, Option<Delivery>) {
        if self.phase == Phase::Completed {
            debug!(trigger = trigger.as_str(), "duplicate completion ignored");
            return (Completion::AlreadyCompleted, None);
        }
        self.phase = Phase::Completed;

        let payload = build();
        let outcome = Completion::Submitted {
            trigger,
            time_spent_secs: payload.time_spent_seconds,
        };
        info!(
            session = %payload.session_id,
            test = %payload.test_id,
            trigger = trigger.as_str(),
            time_spent = payload.time_spent_seconds,
            answers = payload.answers.len(),
            "session completed"
        );
        self.submitted = Some(outcome);
        let delivery = self
            .on_complete
            .take()
            .map(|callback| Delivery { callback, payload });
        (outcome, delivery)
    }
}

impl fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("phase", &self.phase)
            .field("callback_pending", &self.on_complete.is_some())
            .field("submitted", &self.submitted)
            .finish()
    }
}

/// Time spent for a completion: the full duration when the countdown ran
/// out, otherwise wall-clock time since start, capped at the duration.
pub(crate) fn time_spent_secs(trigger: CompletionTrigger, duration_secs: u32, elapsed_secs: u64) -> u32 {
    match trigger {
        CompletionTrigger::Timeout => duration_secs,
        CompletionTrigger::Manual => u32::try_from(elapsed_secs)
            .unwrap_or(u32::MAX)
            .min(duration_secs),
    }
}
