//! Delegation states and their transition table.

use super::ParseDelegationStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of a delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationState {
    /// Created, waiting for the delegate to accept.
    Pending,
    /// The delegate acknowledged the work.
    Accepted,
    /// The delegate started working.
    InProgress,
    /// The delegate finished successfully.
    Completed,
    /// The delegate gave up or could not be reached.
    Failed,
    /// Handed back to the coordinating actor.
    Escalated,
    /// No outcome arrived before the deadline.
    TimedOut,
}

impl DelegationState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Escalated => "escalated",
            Self::TimedOut => "timed_out",
        }
    }

    /// Returns `true` while the delegate still owes an outcome.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted | Self::InProgress)
    }

    /// Returns `true` for states that never change again.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Escalated)
    }

    /// Returns `true` once the delegate can no longer report.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_outstanding()
    }

    /// Returns `true` when the state machine allows `self -> target`.
    ///
    /// Outstanding delegations may also fail (undeliverable work) or be
    /// escalated (cancellation) directly.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Accepted)
                | (Self::Accepted, Self::InProgress)
                | (
                    Self::Accepted | Self::InProgress,
                    Self::Completed
                )
                | (
                    Self::Pending | Self::Accepted | Self::InProgress,
                    Self::Failed | Self::TimedOut | Self::Escalated
                )
                | (Self::Failed | Self::TimedOut, Self::Escalated)
        )
    }
}

impl fmt::Display for DelegationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DelegationState {
    type Error = ParseDelegationStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "escalated" => Ok(Self::Escalated),
            "timed_out" | "timedout" => Ok(Self::TimedOut),
            _ => Err(ParseDelegationStateError(value.to_owned())),
        }
    }
}
