//! The question entity and its localized labels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::QuestionId;

/// Localized label texts keyed by language code (`en`, `fr`, ...).
///
/// A map rather than a list: a language code can only appear once per
/// question, and writing it again replaces the earlier text.
pub type Labels = BTreeMap<String, String>;

/// A question with a name and one label per language.
///
/// `id` stays `None` until the store persists the question and assigns
/// its key. Every question read back from storage has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Store-assigned key, absent while pending creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuestionId>,
    /// Display name of the question.
    pub name: String,
    /// Label text per language code.
    #[serde(default)]
    pub labels: Labels,
}

impl Question {
    /// Build a question that has not been persisted yet.
    pub fn new(name: impl Into<String>, labels: Labels) -> Self {
        Self {
            id: None,
            name: name.into(),
            labels,
        }
    }

    /// Return this question tagged with a store-assigned id.
    #[must_use]
    pub const fn with_id(mut self, id: QuestionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether the question has been assigned an id by the store.
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Set the text for `language`, replacing any previous text.
    pub fn set_label(&mut self, language: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(language.into(), value.into());
    }
}

/// Build a [`Labels`] map from `(language, text)` pairs.
///
/// Later pairs win when a language repeats.
pub fn labels<I, K, V>(pairs: I) -> Labels
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
