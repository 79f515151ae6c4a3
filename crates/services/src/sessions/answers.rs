use serde::Serialize;
use std::collections::BTreeMap;

use exam_core::model::AnswerKey;

/// Live answers for one session. Last write wins; there is no history.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    answers: BTreeMap<AnswerKey, String>,
}

impl AnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: AnswerKey, value: impl Into<String>) {
        self.answers.insert(key, value.into());
    }

    /// Equivalent to setting the empty answer.
    pub fn clear(&mut self, key: AnswerKey) {
        self.set(key, String::new());
    }

    /// Re-selecting the stored value clears it; anything else replaces it.
    ///
    /// Returns the value now stored.
    pub fn toggle(&mut self, key: AnswerKey, value: &str) -> &str {
        let entry = self.answers.entry(key).or_default();
        if entry == value {
            entry.clear();
        } else {
            value.clone_into(entry);
        }
        entry
    }

    #[must_use]
    pub fn get(&self, key: &AnswerKey) -> Option<&str> {
        self.answers.get(key).map(String::as_str)
    }

    /// Keys holding a non-empty answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|v| !v.is_empty()).count()
    }

    /// Independent copy; later writes never show through.
    #[must_use]
    pub fn snapshot(&self) -> AnswerSnapshot {
        AnswerSnapshot(self.answers.clone())
    }
}

/// Frozen answers, serialized as `{ "<key>": "<value>" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerSnapshot(BTreeMap<AnswerKey, String>);

impl AnswerSnapshot {
    #[must_use]
    pub fn get(&self, key: &AnswerKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnswerKey, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::normalize;
    use exam_core::model::{Options, Part, PartBody, PartId, Question, QuestionId, TestDocument, TestId};

    fn keys(count: u64) -> Vec<AnswerKey> {
        let questions = (1..=count)
            .map(|id| Question::new(QuestionId::new(id), "q", Options::default()))
            .collect();
        let doc = TestDocument {
            id: TestId::new(1),
            duration_seconds: 60,
            parts: vec![Part::new(PartId::new(1), PartBody::Discrete { questions })],
        };
        normalize(&doc).questions().map(|q| q.key.clone()).collect()
    }

    #[test]
    fn repeated_identical_set_is_idempotent() {
        let key = keys(1).remove(0);
        let mut store = AnswerStore::new();
        store.set(key.clone(), "A");
        store.set(key.clone(), "A");
        assert_eq!(store.snapshot().get(&key), Some("A"));
    }

    #[test]
    fn clear_stores_empty_answer() {
        let key = keys(1).remove(0);
        let mut store = AnswerStore::new();
        store.set(key.clone(), "B");
        store.clear(key.clone());
        assert_eq!(store.get(&key), Some(""));
        assert_eq!(store.answered_count(), 0);
    }

    #[test]
    fn toggle_flips_between_value_and_empty() {
        let key = keys(1).remove(0);
        let mut store = AnswerStore::new();
        assert_eq!(store.toggle(key.clone(), "C"), "C");
        assert_eq!(store.toggle(key.clone(), "C"), "");
        assert_eq!(store.toggle(key.clone(), "D"), "D");
        assert_eq!(store.toggle(key, "A"), "A");
    }

    #[test]
    fn snapshot_is_independent_of_later_writes() {
        let all = keys(2);
        let mut store = AnswerStore::new();
        store.set(all[0].clone(), "A");
        let before = store.snapshot();

        store.set(all[0].clone(), "B");
        store.set(all[1].clone(), "C");

        assert_eq!(before.get(&all[0]), Some("A"));
        assert_eq!(before.get(&all[1]), None);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn unrelated_keys_are_untouched() {
        let all = keys(3);
        let mut store = AnswerStore::new();
        store.set(all[0].clone(), "A");
        store.set(all[2].clone(), "C");
        store.clear(all[0].clone());
        assert_eq!(store.get(&all[2]), Some("C"));
        assert_eq!(store.get(&all[1]), None);
    }

    #[test]
    fn snapshot_serializes_with_wire_keys() {
        let all = keys(2);
        let mut store = AnswerStore::new();
        store.set(all[1].clone(), "B");
        let json = serde_json::to_string(&store.snapshot()).unwrap();
        assert_eq!(json, r#"{"0:1:-:1":"B"}"#);
    }
}
