mod answer;
mod document;
mod ids;
mod question;
mod settings;

pub use answer::AnswerKey;
pub use document::{AudioRef, Conversation, DocumentError, Lecture, Part, PartBody, TestDocument};
pub use ids::{ParseIdError, PartId, QuestionId, SessionId, TestId, UnitId};
pub use question::{Choice, OptionKey, Options, Question};
pub use settings::{SessionSettings, SettingsError};
