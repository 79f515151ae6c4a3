use exam_core::model::{AnswerKey, Question, UnitId};
use exam_core::{PartKind, Position};

use super::audio::AudioStatus;

/// Presentation-agnostic view of the unit on screen.
///
/// Borrowed from the session; nothing here is pre-formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitView<'a> {
    pub position: Position,
    pub kind: PartKind,
    pub part_title: Option<&'a str>,
    pub unit_id: Option<UnitId>,
    pub examples: &'a [Question],
    pub questions: Vec<QuestionView<'a>>,
    pub audio: AudioView<'a>,
}

impl UnitView<'_> {
    /// The unit is a placeholder for a part that could not be presented.
    #[must_use]
    pub fn content_unavailable(&self) -> bool {
        self.kind == PartKind::Unsupported
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView<'a> {
    pub key: &'a AnswerKey,
    pub number: usize,
    pub question: &'a Question,
    pub answer: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioView<'a> {
    pub status: &'a AudioStatus,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub controls_enabled: bool,
}
