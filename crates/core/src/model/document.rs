use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{PartId, TestId, UnitId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("test document has no parts")]
    NoParts,

    #[error("test duration must be > 0 seconds")]
    InvalidDuration,

    #[error("malformed test document: {0}")]
    Json(#[from] serde_json::Error),
}

//
// ─── AUDIO REFERENCE ───────────────────────────────────────────────────────────
//

/// Opaque audio handle. Resolving it into a playable URL is someone else's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── PARTS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: UnitId,
    pub audio_ref: AudioRef,
    pub question: Question,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: UnitId,
    pub audio_ref: AudioRef,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Shape of a part, tagged on the wire by `partKind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "partKind", rename_all = "camelCase")]
pub enum PartBody {
    Discrete {
        #[serde(default)]
        questions: Vec<Question>,
    },
    ConversationGroup {
        #[serde(default)]
        conversations: Vec<Conversation>,
    },
    #[serde(rename_all = "camelCase")]
    Monologue {
        audio_ref: AudioRef,
        #[serde(default)]
        questions: Vec<Question>,
    },
    LectureGroup {
        #[serde(default)]
        lectures: Vec<Lecture>,
    },
    /// Any kind this engine does not know how to present.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: PartId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub body: PartBody,
}

impl Part {
    pub fn new(id: PartId, body: PartBody) -> Self {
        Self {
            id,
            title: None,
            body,
        }
    }
}

//
// ─── DOCUMENT ──────────────────────────────────────────────────────────────────
//

/// A loaded test, read-only for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDocument {
    pub id: TestId,
    pub duration_seconds: u32,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl TestDocument {
    /// Parse a document from its JSON form and check it can back a session.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Json` for malformed input, or the validation
    /// errors of [`TestDocument::validate`].
    pub fn from_json(raw: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_json::from_str(raw)?;
        doc.validate()?;
        Ok(doc)
    }

    /// # Errors
    ///
    /// Returns `DocumentError::NoParts` when there is nothing to navigate and
    /// `DocumentError::InvalidDuration` for a zero duration.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.parts.is_empty() {
            return Err(DocumentError::NoParts);
        }
        if self.duration_seconds == 0 {
            return Err(DocumentError::InvalidDuration);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": 9,
        "durationSeconds": 1800,
        "parts": [
            {"id": 1, "title": "Part 1", "partKind": "discrete",
             "questions": [
                {"id": 1, "text": "ex", "options": ["a", "b"], "isExample": true},
                {"id": 2, "text": "q", "options": {"A": "x", "B": "y"}}
             ]},
            {"id": 2, "partKind": "conversationGroup",
             "conversations": [
                {"id": 20, "audioRef": "c-20", "question": {"id": 1, "text": "who?"}}
             ]},
            {"id": 3, "partKind": "monologue", "audioRef": "m-3",
             "questions": [{"id": 1}, {"id": 2}]},
            {"id": 4, "partKind": "lectureGroup",
             "lectures": [{"id": 40, "audioRef": "l-40", "questions": [{"id": 5}]}]},
            {"id": 5, "partKind": "paragraphHeadings", "paragraphs": ["p1"]}
        ]
    }"#;

    #[test]
    fn parses_every_part_shape() {
        let doc = TestDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.id, TestId::new(9));
        assert_eq!(doc.parts.len(), 5);
        assert_eq!(doc.parts[0].title.as_deref(), Some("Part 1"));
        assert!(matches!(
            &doc.parts[1].body,
            PartBody::ConversationGroup { conversations } if conversations[0].audio_ref.as_str() == "c-20"
        ));
        assert!(matches!(
            &doc.parts[2].body,
            PartBody::Monologue { questions, .. } if questions.len() == 2
        ));
        assert!(matches!(&doc.parts[3].body, PartBody::LectureGroup { .. }));
    }

    #[test]
    fn unknown_part_kind_becomes_unsupported() {
        let doc = TestDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.parts[4].id, PartId::new(5));
        assert_eq!(doc.parts[4].body, PartBody::Unsupported);
    }

    #[test]
    fn rejects_empty_and_zero_duration() {
        let err = TestDocument::from_json(r#"{"id": 1, "durationSeconds": 60, "parts": []}"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::NoParts));

        let err = TestDocument::from_json(
            r#"{"id": 1, "durationSeconds": 0, "parts": [{"id": 1, "partKind": "discrete"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidDuration));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = TestDocument::from_json("{").unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));
    }
}
