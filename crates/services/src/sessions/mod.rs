mod answers;
mod audio;
mod countdown;
mod progress;
mod service;
mod submission;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use answers::{AnswerSnapshot, AnswerStore};
pub use audio::{
    AudioCommand, AudioController, AudioEvent, AudioLoadTicket, AudioResolver, AudioStatus,
    BaseUrlResolver,
};
pub use countdown::{Countdown, Tick};
pub use progress::SessionProgress;
pub use service::{Navigation, SessionService};
pub use submission::{Completion, CompletionTrigger, OnComplete, Phase, SubmissionPayload};
pub use view::{AudioView, QuestionView, UnitView};
pub use workflow::SessionHandle;
