use serde::{Serialize, Serializer};
use std::fmt;

use crate::model::ids::PartId;

/// Composite slot identifying one answer.
///
/// Question ids repeat across parts, so the slot is positional: the part (by
/// index and id), the conversation/lecture index when the part has one, and
/// the question's index within its owning list. Keys are only built by the
/// content adapter, which hands every answerable question exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnswerKey {
    part_index: usize,
    part_id: PartId,
    sub_unit: Option<usize>,
    question: usize,
}

impl AnswerKey {
    pub(crate) fn new(
        part_index: usize,
        part_id: PartId,
        sub_unit: Option<usize>,
        question: usize,
    ) -> Self {
        Self {
            part_index,
            part_id,
            sub_unit,
            question,
        }
    }

    #[must_use]
    pub fn part_index(&self) -> usize {
        self.part_index
    }

    #[must_use]
    pub fn part_id(&self) -> PartId {
        self.part_id
    }

    #[must_use]
    pub fn sub_unit(&self) -> Option<usize> {
        self.sub_unit
    }

    #[must_use]
    pub fn question(&self) -> usize {
        self.question
    }
}

/// Wire form: `<partIndex>:<partId>:<subUnit|->:<question>`.
impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.part_index, self.part_id)?;
        match self.sub_unit {
            Some(sub) => write!(f, "{sub}")?,
            None => f.write_str("-")?,
        }
        write!(f, ":{}", self.question)
    }
}

impl Serialize for AnswerKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
