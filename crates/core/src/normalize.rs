//! Content adapter: turns a [`TestDocument`] of mixed part shapes into one
//! uniform list of navigable units per part.
//!
//! Every question that can be answered is assigned its [`AnswerKey`] and its
//! absolute question number here, once, so navigation and progress never
//! need to look at part shapes again.

use std::ops::RangeInclusive;

use crate::model::{
    AnswerKey, AudioRef, PartBody, PartId, Question, TestDocument, TestId, UnitId,
};

//
// ─── NORMALIZED TYPES ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Discrete,
    ConversationGroup,
    Monologue,
    LectureGroup,
    /// Placeholder for a part this engine cannot present.
    Unsupported,
}

impl PartKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PartKind::Discrete => "discrete",
            PartKind::ConversationGroup => "conversation_group",
            PartKind::Monologue => "monologue",
            PartKind::LectureGroup => "lecture_group",
            PartKind::Unsupported => "unsupported",
        }
    }
}

/// Navigator coordinates. `sub_unit` is `None` for single-step parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub part: usize,
    pub sub_unit: Option<usize>,
}

impl Position {
    #[must_use]
    pub fn new(part: usize, sub_unit: Option<usize>) -> Self {
        Self { part, sub_unit }
    }
}

/// An answerable question as displayed inside a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitQuestion {
    pub key: AnswerKey,
    /// 1-based absolute number across the whole test.
    pub number: usize,
    pub question: Question,
}

/// One navigation stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub position: Position,
    pub kind: PartKind,
    /// Conversation or lecture id, when the stop is one.
    pub unit_id: Option<UnitId>,
    pub audio: Option<AudioRef>,
    pub questions: Vec<UnitQuestion>,
    /// Worked examples shown alongside, never answered.
    pub examples: Vec<Question>,
    /// Absolute number of the first question here (or of the next question
    /// in the test, when this stop has none).
    pub first_number: usize,
}

impl Unit {
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.kind == PartKind::Unsupported
    }

    /// Inclusive range of absolute numbers shown on this stop.
    #[must_use]
    pub fn question_range(&self) -> Option<RangeInclusive<usize>> {
        let first = self.questions.first()?.number;
        let last = self.questions.last()?.number;
        Some(first..=last)
    }

    /// The question at `index` in display order.
    #[must_use]
    pub fn question(&self, index: usize) -> Option<&UnitQuestion> {
        self.questions.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPart {
    pub index: usize,
    pub id: PartId,
    pub title: Option<String>,
    pub kind: PartKind,
    /// Conversations or lectures; 0 for parts without a sub-navigation level.
    pub sub_unit_count: usize,
    /// Countable questions (examples excluded).
    pub question_count: usize,
    /// Never empty.
    pub units: Vec<Unit>,
}

impl NormalizedPart {
    /// Number of navigation stops.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.units.len()
    }

    /// True when stops are addressed by a sub-unit index.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.units.first().is_some_and(|u| u.position.sub_unit.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTest {
    pub test_id: TestId,
    pub duration_secs: u32,
    pub parts: Vec<NormalizedPart>,
    pub total_questions: usize,
}

impl NormalizedTest {
    #[must_use]
    pub fn part(&self, index: usize) -> Option<&NormalizedPart> {
        self.parts.get(index)
    }

    #[must_use]
    pub fn unit(&self, position: Position) -> Option<&Unit> {
        let part = self.parts.get(position.part)?;
        match position.sub_unit {
            Some(step) if part.is_indexed() => part.units.get(step),
            None if !part.is_indexed() => part.units.first(),
            _ => None,
        }
    }

    /// Absolute number of the first question at `position`.
    #[must_use]
    pub fn question_number(&self, position: Position) -> Option<usize> {
        self.unit(position).map(|u| u.first_number)
    }

    /// Every answerable question in document order.
    pub fn questions(&self) -> impl Iterator<Item = &UnitQuestion> {
        self.parts
            .iter()
            .flat_map(|p| p.units.iter())
            .flat_map(|u| u.questions.iter())
    }
}

//
// ─── ADAPTER ───────────────────────────────────────────────────────────────────
//

struct Numbering {
    next: usize,
}

impl Numbering {
    fn take(&mut self) -> usize {
        let n = self.next;
        self.next += 1;
        n
    }
}

/// Normalize a document. Pure and total: unknown part kinds become
/// [`PartKind::Unsupported`] stops instead of failing the whole test.
#[must_use]
pub fn normalize(doc: &TestDocument) -> NormalizedTest {
    let mut numbering = Numbering { next: 1 };
    let parts = doc
        .parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            let (kind, sub_unit_count, units) =
                build_units(index, part.id, &part.body, &mut numbering);
            let question_count = units.iter().map(|u| u.questions.len()).sum();
            NormalizedPart {
                index,
                id: part.id,
                title: part.title.clone(),
                kind,
                sub_unit_count,
                question_count,
                units,
            }
        })
        .collect();

    NormalizedTest {
        test_id: doc.id,
        duration_secs: doc.duration_seconds,
        parts,
        total_questions: numbering.next - 1,
    }
}

fn build_units(
    part: usize,
    part_id: PartId,
    body: &PartBody,
    numbering: &mut Numbering,
) -> (PartKind, usize, Vec<Unit>) {
    match body {
        PartBody::Discrete { questions } => {
            let examples: Vec<Question> =
                questions.iter().filter(|q| q.is_example).cloned().collect();
            let answerable: Vec<(usize, &Question)> = questions
                .iter()
                .enumerate()
                .filter(|(_, q)| !q.is_example)
                .collect();

            if answerable.is_empty() {
                let mut unit = inert(part, PartKind::Discrete, numbering.next);
                unit.examples = examples;
                return (PartKind::Discrete, 0, vec![unit]);
            }

            let mut examples = Some(examples);
            let units = answerable
                .into_iter()
                .enumerate()
                .map(|(step, (q_index, question))| {
                    let number = numbering.take();
                    Unit {
                        position: Position::new(part, Some(step)),
                        kind: PartKind::Discrete,
                        unit_id: None,
                        audio: None,
                        questions: vec![UnitQuestion {
                            key: AnswerKey::new(part, part_id, None, q_index),
                            number,
                            question: question.clone(),
                        }],
                        examples: examples.take().unwrap_or_default(),
                        first_number: number,
                    }
                })
                .collect();
            (PartKind::Discrete, 0, units)
        }
        PartBody::ConversationGroup { conversations } => {
            if conversations.is_empty() {
                let unit = inert(part, PartKind::ConversationGroup, numbering.next);
                return (PartKind::ConversationGroup, 0, vec![unit]);
            }
            let units = conversations
                .iter()
                .enumerate()
                .map(|(sub, conversation)| {
                    let number = numbering.take();
                    Unit {
                        position: Position::new(part, Some(sub)),
                        kind: PartKind::ConversationGroup,
                        unit_id: Some(conversation.id),
                        audio: Some(conversation.audio_ref.clone()),
                        questions: vec![UnitQuestion {
                            key: AnswerKey::new(part, part_id, Some(sub), 0),
                            number,
                            question: conversation.question.clone(),
                        }],
                        examples: Vec::new(),
                        first_number: number,
                    }
                })
                .collect();
            (PartKind::ConversationGroup, conversations.len(), units)
        }
        PartBody::Monologue {
            audio_ref,
            questions,
        } => {
            let first_number = numbering.next;
            let (questions, examples) = split_questions(part, part_id, None, questions, numbering);
            let unit = Unit {
                position: Position::new(part, None),
                kind: PartKind::Monologue,
                unit_id: None,
                audio: Some(audio_ref.clone()),
                questions,
                examples,
                first_number,
            };
            (PartKind::Monologue, 0, vec![unit])
        }
        PartBody::LectureGroup { lectures } => {
            if lectures.is_empty() {
                let unit = inert(part, PartKind::LectureGroup, numbering.next);
                return (PartKind::LectureGroup, 0, vec![unit]);
            }
            let units = lectures
                .iter()
                .enumerate()
                .map(|(sub, lecture)| {
                    let first_number = numbering.next;
                    let (questions, examples) =
                        split_questions(part, part_id, Some(sub), &lecture.questions, numbering);
                    Unit {
                        position: Position::new(part, Some(sub)),
                        kind: PartKind::LectureGroup,
                        unit_id: Some(lecture.id),
                        audio: Some(lecture.audio_ref.clone()),
                        questions,
                        examples,
                        first_number,
                    }
                })
                .collect();
            (PartKind::LectureGroup, lectures.len(), units)
        }
        PartBody::Unsupported => (
            PartKind::Unsupported,
            0,
            vec![inert(part, PartKind::Unsupported, numbering.next)],
        ),
    }
}

fn split_questions(
    part: usize,
    part_id: PartId,
    sub_unit: Option<usize>,
    questions: &[Question],
    numbering: &mut Numbering,
) -> (Vec<UnitQuestion>, Vec<Question>) {
    let mut answerable = Vec::new();
    let mut examples = Vec::new();
    for (q_index, question) in questions.iter().enumerate() {
        if question.is_example {
            examples.push(question.clone());
            continue;
        }
        answerable.push(UnitQuestion {
            key: AnswerKey::new(part, part_id, sub_unit, q_index),
            number: numbering.take(),
            question: question.clone(),
        });
    }
    (answerable, examples)
}

fn inert(part: usize, kind: PartKind, next_number: usize) -> Unit {
    Unit {
        position: Position::new(part, None),
        kind,
        unit_id: None,
        audio: None,
        questions: Vec::new(),
        examples: Vec::new(),
        first_number: next_number,
    }
}
