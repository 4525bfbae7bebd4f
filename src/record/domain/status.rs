//! Record lifecycle status and its transition table.

use super::ParseRecordStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a record.
///
/// The enumeration is closed. Human-facing labels (including the emoji
/// prefixes found in hand-written documents) are produced and accepted only
/// by [`RecordStatus::label`] and [`TryFrom<&str>`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Work has not started.
    ToDo,
    /// Work is underway.
    InProgress,
    /// Work is finished and awaiting review.
    Review,
    /// Work is accepted.
    Done,
    /// Work is paused on an external impediment.
    Blocked,
    /// The record has been retired without deletion.
    Archived,
}

impl RecordStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::ToDo,
        Self::InProgress,
        Self::Review,
        Self::Done,
        Self::Blocked,
        Self::Archived,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
            Self::Blocked => "blocked",
            Self::Archived => "archived",
        }
    }

    /// Returns the human-facing label written into documents.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ToDo => "🟡 To Do",
            Self::InProgress => "🔵 In Progress",
            Self::Review => "🟣 Review",
            Self::Done => "🟢 Done",
            Self::Blocked => "🔴 Blocked",
            Self::Archived => "⚪ Archived",
        }
    }

    /// Returns `true` for statuses with no ordinary successors.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Archived)
    }

    /// Returns `true` when a dependency in this status no longer holds back
    /// its dependents.
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns `true` when the transition `self -> target` is in the
    /// ordinary transition table.
    ///
    /// The un-archive path (`Archived -> ToDo`) is not ordinary; see
    /// [`RecordStatus::is_unarchive`].
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::ToDo, Self::InProgress)
                | (Self::InProgress, Self::Review | Self::Blocked)
                | (Self::Blocked, Self::InProgress)
                | (Self::Review, Self::Done)
                | (
                    Self::ToDo | Self::InProgress | Self::Blocked | Self::Review,
                    Self::Archived
                )
        )
    }

    /// Returns `true` for the explicit un-archive transition.
    #[must_use]
    pub const fn is_unarchive(self, target: Self) -> bool {
        matches!((self, target), (Self::Archived, Self::ToDo))
    }

    /// Returns the ordinary successors of this status.
    #[must_use]
    pub fn successors(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RecordStatus {
    type Error = ParseRecordStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let without_emoji = value
            .trim()
            .trim_start_matches(|ch: char| !ch.is_ascii_alphanumeric())
            .trim();
        let normalized: String = without_emoji
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "todo" => Ok(Self::ToDo),
            "inprogress" => Ok(Self::InProgress),
            "review" | "inreview" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseRecordStatusError(value.to_owned())),
        }
    }
}
