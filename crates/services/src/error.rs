//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{DocumentError, SettingsError};

/// Errors emitted by the session engine.
///
/// Per-unit problems (unsupported parts, unavailable audio) are not errors;
/// they are reported through the unit view and audio status instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("test has nothing to navigate")]
    Empty,
    /// A mutation arrived after the session completed.
    #[error("session already completed; rejected {action}")]
    InvalidTransition { action: &'static str },
    #[error("session has been torn down")]
    Inactive,
    #[error("no question at index {index} on the current unit")]
    UnknownQuestion { index: usize },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Failure reported by an audio resolver or the media resource itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AudioError {
    #[error("audio reference {0} could not be resolved")]
    Unresolved(String),
    #[error("audio source is not a valid URL: {0}")]
    InvalidUrl(String),
    #[error("media failed to load: {0}")]
    Media(String),
}

/// Errors emitted by `SubmissionClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("submission endpoint is not configured")]
    Disabled,
    #[error("submission request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
