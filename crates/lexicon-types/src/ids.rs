//! Type-safe identifier wrappers.
//!
//! Questions are keyed by the `serial` primary key `PostgreSQL` assigns on
//! insert. The newtype keeps those keys from being mixed up with counts or
//! label row ids at compile time.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a persisted question.
///
/// Only the store hands these out; a question that has not been created
/// yet carries no id at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub i32);

impl QuestionId {
    /// Return the inner integer value.
    pub const fn into_inner(self) -> i32 {
        self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for QuestionId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<QuestionId> for i32 {
    fn from(id: QuestionId) -> Self {
        id.0
    }
}

/// Error returned when a path segment is not a valid [`QuestionId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid question id: {input:?}")]
pub struct ParseIdError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(Self).map_err(|_e| ParseIdError {
            input: s.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_ids() {
        assert_eq!("42".parse::<QuestionId>(), Ok(QuestionId(42)));
        assert_eq!(" 7 ".parse::<QuestionId>(), Ok(QuestionId(7)));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let err = "abc".parse::<QuestionId>().unwrap_err();
        assert_eq!(err.input, "abc");
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&QuestionId(3)).unwrap();
        assert_eq!(json, "3");
    }
}
