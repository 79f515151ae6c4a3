use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::ids::QuestionId;

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Key of a selectable option (`A`, `B`, ...), also the stored answer value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionKey(String);

impl OptionKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Positional key for list-shaped options: `A`..`Z`, then `27`, `28`, ...
    #[must_use]
    pub fn for_position(index: usize) -> Self {
        match u8::try_from(index) {
            Ok(i) if i < 26 => Self(char::from(b'A' + i).to_string()),
            _ => Self((index + 1).to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub key: OptionKey,
    pub text: String,
}

/// Canonical option representation.
///
/// Both wire shapes (a plain list, or an object keyed by option key) convert
/// into `Choices` at deserialization time, so nothing downstream branches on
/// the source shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawOptions")]
pub enum Options {
    Choices(Vec<Choice>),
    /// Items the learner arranges into an order; the answer is the arrangement.
    Ordering(Vec<String>),
}

impl Default for Options {
    fn default() -> Self {
        Options::Choices(Vec::new())
    }
}

impl Options {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Options::Choices(choices) => choices.len(),
            Options::Ordering(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a choice by key. Ordering payloads have no keyed choices.
    #[must_use]
    pub fn choice(&self, key: &str) -> Option<&Choice> {
        match self {
            Options::Choices(choices) => choices.iter().find(|c| c.key.as_str() == key),
            Options::Ordering(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOptions {
    Ordering { ordering: Vec<String> },
    Keyed(BTreeMap<String, String>),
    List(Vec<String>),
}

impl From<RawOptions> for Options {
    fn from(raw: RawOptions) -> Self {
        match raw {
            RawOptions::Ordering { ordering } => Options::Ordering(ordering),
            RawOptions::Keyed(map) => Options::Choices(
                map.into_iter()
                    .map(|(key, text)| Choice {
                        key: OptionKey::new(key),
                        text,
                    })
                    .collect(),
            ),
            RawOptions::List(items) => Options::Choices(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| Choice {
                        key: OptionKey::for_position(i),
                        text,
                    })
                    .collect(),
            ),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Options,
    /// Worked example shown for context; never answered or counted.
    #[serde(default)]
    pub is_example: bool,
}

impl Question {
    pub fn new(id: QuestionId, text: impl Into<String>, options: Options) -> Self {
        Self {
            id,
            text: text.into(),
            options,
            is_example: false,
        }
    }

    #[must_use]
    pub fn as_example(mut self) -> Self {
        self.is_example = true;
        self
    }
}
