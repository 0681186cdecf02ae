//! Item lifecycle status

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Item status
///
/// `Complete` and `Waived` lock the item's definition: patches may still
/// move open items, append to the ask log or change the status itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No status recorded yet
    #[default]
    Empty,
    /// Created, not yet elaborated
    Draft,
    /// Partially specified
    Partial,
    /// Fully specified
    Complete,
    /// Explicitly waived by the user
    Waived,
}

impl Status {
    /// All statuses
    pub const ALL: [Status; 5] = [
        Status::Empty,
        Status::Draft,
        Status::Partial,
        Status::Complete,
        Status::Waived,
    ];

    /// Wire token
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Empty => "empty",
            Status::Draft => "draft",
            Status::Partial => "partial",
            Status::Complete => "complete",
            Status::Waived => "waived",
        }
    }

    /// Whether definition segments are frozen
    #[inline]
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Status::Complete | Status::Waived)
    }

    /// Lenient token match used by the delta parser
    ///
    /// Returns `None` for anything that is not exactly a status word.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Status> {
        let token = token
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_ascii_lowercase();
        match token.as_str() {
            "empty" => Some(Status::Empty),
            "draft" => Some(Status::Draft),
            "partial" => Some(Status::Partial),
            "complete" | "completed" => Some(Status::Complete),
            "waived" => Some(Status::Waived),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Status::Empty);
        }
        Status::from_token(s).ok_or_else(|| ModelError::UnknownStatus(s.to_string()))
    }
}
