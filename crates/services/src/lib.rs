#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;
pub mod submission_client;

pub use exam_core::Clock;
pub use sessions as session;

pub use error::{AudioError, SessionError, SubmissionError};
pub use sessions::{
    Completion, CompletionTrigger, Navigation, SessionHandle, SessionProgress, SessionService,
    SubmissionPayload,
};
pub use submission_client::{SubmissionClient, SubmissionConfig, SubmissionReceipt};
