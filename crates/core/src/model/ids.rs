use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+)$").expect("trailing number pattern is valid"));

/// Stable key of one exercise, shaped `<prefix>-<number>` (e.g. `lists-3`).
///
/// The shape is not enforced: ids read back from persisted progress are kept
/// verbatim so that catalog changes never drop a learner's history.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseId(String);

impl ExerciseId {
    /// Creates an `ExerciseId` without validating its shape.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing exercise number as written in the id (`"lists-10"` -> `"10"`).
    #[must_use]
    pub fn number(&self) -> Option<&str> {
        TRAILING_NUMBER
            .captures(&self.0)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl fmt::Debug for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExerciseId({})", self.0)
    }
}

impl fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExerciseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error type for parsing an `ExerciseId` from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ExerciseIdError {
    #[error("exercise id cannot be empty")]
    Empty,
    #[error("exercise id cannot contain whitespace: {0:?}")]
    Whitespace(String),
}

impl FromStr for ExerciseId {
    type Err = ExerciseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ExerciseIdError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ExerciseIdError::Whitespace(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}
