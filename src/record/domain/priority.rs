//! Record priority.

use super::ParsePriorityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered record priority, `Highest` first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Drop everything else.
    Highest,
    /// Schedule ahead of normal work.
    High,
    /// Normal work.
    #[default]
    Medium,
    /// Schedule after normal work.
    Low,
    /// Only when nothing else is pending.
    Lowest,
}

impl Priority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Highest => "highest",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Lowest => "lowest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParsePriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value
            .trim()
            .trim_start_matches(|ch: char| !ch.is_ascii_alphanumeric())
            .trim()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "highest" | "critical" => Ok(Self::Highest),
            "high" => Ok(Self::High),
            "medium" | "normal" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "lowest" => Ok(Self::Lowest),
            _ => Err(ParsePriorityError(value.to_owned())),
        }
    }
}
