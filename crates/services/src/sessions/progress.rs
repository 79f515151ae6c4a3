use std::ops::RangeInclusive;

use super::submission::Phase;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// Absolute number of the first question on the current unit.
    pub current_number: usize,
    /// Numbers shown on the current unit, when it has any questions.
    pub question_range: Option<RangeInclusive<usize>>,
    pub total_questions: usize,
    pub answered: usize,
    pub remaining_secs: u32,
    pub part_index: usize,
    pub part_count: usize,
    pub phase: Phase,
}

impl SessionProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Completed
    }

    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total_questions.saturating_sub(self.answered)
    }
}
