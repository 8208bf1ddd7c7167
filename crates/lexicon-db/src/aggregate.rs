//! Folding flat join rows into questions.
//!
//! The question queries left-join `questions` with `labels`, which yields
//! one row per (question, label) pair and a single row with null label
//! columns for a question that has no labels. [`aggregate`] merges those
//! rows back into one [`Question`] per id.

use std::collections::HashMap;

use lexicon_types::{Labels, Question, QuestionId};

/// One row of the `questions LEFT OUTER JOIN labels` query.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct QuestionRow {
    /// Question id.
    pub id: i32,
    /// Question name.
    pub name: String,
    /// Label language, null when the question has no labels.
    pub language: Option<String>,
    /// Label text, null when the question has no labels.
    pub value: Option<String>,
}

impl QuestionRow {
    /// Build a row carrying one label.
    pub fn labelled(id: i32, name: &str, language: &str, value: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            language: Some(language.to_owned()),
            value: Some(value.to_owned()),
        }
    }

    /// Build the null-label row of a question without labels.
    pub fn bare(id: i32, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            language: None,
            value: None,
        }
    }
}

/// Merge join rows into questions.
///
/// Questions come out in the order their id first appears in `rows`. A
/// repeated language for the same question keeps the last text seen.
pub fn aggregate<I>(rows: I) -> Vec<Question>
where
    I: IntoIterator<Item = QuestionRow>,
{
    let mut questions: Vec<Question> = Vec::new();
    let mut positions: HashMap<QuestionId, usize> = HashMap::new();

    for row in rows {
        let id = QuestionId(row.id);
        let label = row.language.zip(row.value);

        if let Some(existing) = positions.get(&id).and_then(|&at| questions.get_mut(at)) {
            if let Some((language, value)) = label {
                existing.labels.insert(language, value);
            }
            continue;
        }

        positions.insert(id, questions.len());
        questions.push(Question {
            id: Some(id),
            name: row.name,
            labels: label.into_iter().collect::<Labels>(),
        });
    }

    questions
}

/// Merge join rows that belong to at most one question.
pub fn aggregate_one<I>(rows: I) -> Option<Question>
where
    I: IntoIterator<Item = QuestionRow>,
{
    aggregate(rows).into_iter().next()
}
