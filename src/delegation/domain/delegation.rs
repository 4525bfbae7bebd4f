//! The delegation aggregate.

use super::{DelegationDomainError, DelegationHandle, DelegationState};
use crate::record::domain::{ActorId, RecordId};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Self-reported certainty of a delegate, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Creates a validated confidence value.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationDomainError::InvalidConfidence`] outside `[0, 1]`
    /// or for NaN.
    pub fn new(value: f64) -> Result<Self, DelegationDomainError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DelegationDomainError::InvalidConfidence(value.to_string()))
        }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = DelegationDomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Result a delegate reports for its work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The work is done.
    Completed {
        /// What was done.
        summary: String,
    },
    /// The work could not be done.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

impl Outcome {
    /// Creates a completed outcome.
    #[must_use]
    pub fn completed(summary: impl Into<String>) -> Self {
        Self::Completed {
            summary: summary.into(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Why a delegation was escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationCause {
    /// The coordinating actor asked for it after a failure or timeout.
    Requested,
    /// The record was archived while the work was outstanding.
    Cancelled,
}

impl EscalationCause {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EscalationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details recorded when a delegation is escalated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    /// Free-text reason for the coordinating actor.
    pub reason: String,
    /// What triggered the escalation.
    pub cause: EscalationCause,
}

/// Parameters for creating a delegation.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationParams {
    /// Record being delegated.
    pub task_id: RecordId,
    /// Coordinating actor.
    pub from_actor: ActorId,
    /// Delegate actor.
    pub to_actor: ActorId,
    /// Opaque instructions for the delegate.
    pub instructions: serde_json::Value,
    /// Time allowed for an outcome.
    pub timeout: TimeDelta,
}

/// One hand-off of a record from a coordinating actor to a delegate.
///
/// Delegations are not records: they never appear in the task store and
/// carry their own state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    /// Unique handle.
    pub handle: DelegationHandle,
    /// Record being worked on.
    pub task_id: RecordId,
    /// Coordinating actor.
    pub from_actor: ActorId,
    /// Delegate actor.
    pub to_actor: ActorId,
    /// Opaque instructions for the delegate.
    pub instructions: serde_json::Value,
    /// Current state.
    pub state: DelegationState,
    /// Confidence reported with the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// When the delegation was created.
    pub created_at: DateTime<Utc>,
    /// When the state last changed.
    pub updated_at: DateTime<Utc>,
    /// When outstanding work times out.
    pub deadline: DateTime<Utc>,
    /// Summary reported on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Reason reported on failure or recorded on timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Escalation details, once escalated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
}

impl Delegation {
    /// Creates a pending delegation whose deadline is `timeout` from now.
    #[must_use]
    pub fn new(params: DelegationParams, clock: &impl Clock) -> Self {
        let now = clock.utc();
        Self {
            handle: DelegationHandle::new(),
            task_id: params.task_id,
            from_actor: params.from_actor,
            to_actor: params.to_actor,
            instructions: params.instructions,
            state: DelegationState::Pending,
            confidence: None,
            created_at: now,
            updated_at: now,
            deadline: now
                .checked_add_signed(params.timeout)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            summary: None,
            failure_reason: None,
            escalation: None,
        }
    }

    /// Returns `true` when outstanding work has reached its deadline.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.state.is_outstanding() && now >= self.deadline
    }

    /// Records the delegate's acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationDomainError::InvalidTransition`] unless pending.
    pub fn accept(self, clock: &impl Clock) -> Result<Self, DelegationDomainError> {
        self.move_to(DelegationState::Accepted, clock)
    }

    /// Records that the delegate started working.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationDomainError::InvalidTransition`] unless accepted.
    pub fn start(self, clock: &impl Clock) -> Result<Self, DelegationDomainError> {
        self.move_to(DelegationState::InProgress, clock)
    }

    /// Applies a reported outcome.
    ///
    /// Outcomes are accepted only once the delegate has acknowledged the
    /// work.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationDomainError::InvalidTransition`] unless accepted
    /// or in progress.
    pub fn report(
        self,
        outcome: Outcome,
        confidence: Option<Confidence>,
        clock: &impl Clock,
    ) -> Result<Self, DelegationDomainError> {
        let (target, summary, failure_reason) = match outcome {
            Outcome::Completed { summary } => (DelegationState::Completed, Some(summary), None),
            Outcome::Failed { reason } => (DelegationState::Failed, None, Some(reason)),
        };
        if !matches!(
            self.state,
            DelegationState::Accepted | DelegationState::InProgress
        ) {
            return Err(self.refuse(target));
        }
        let mut reported = self.move_to(target, clock)?;
        reported.confidence = confidence;
        reported.summary = summary;
        reported.failure_reason = failure_reason;
        Ok(reported)
    }

    /// Marks outstanding work as undeliverable.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationDomainError::InvalidTransition`] unless
    /// outstanding.
    pub fn fail(self, reason: impl Into<String>, clock: &impl Clock) -> Result<Self, DelegationDomainError> {
        let mut failed = self.move_to(DelegationState::Failed, clock)?;
        failed.failure_reason = Some(reason.into());
        Ok(failed)
    }

    /// Marks outstanding work as timed out.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationDomainError::InvalidTransition`] unless
    /// outstanding.
    pub fn time_out(self, clock: &impl Clock) -> Result<Self, DelegationDomainError> {
        let mut timed_out = self.move_to(DelegationState::TimedOut, clock)?;
        timed_out.failure_reason = Some("no outcome before the deadline".to_owned());
        Ok(timed_out)
    }

    /// Hands the delegation back to the coordinating actor.
    ///
    /// A requested escalation needs a failed or timed-out delegation; a
    /// cancellation needs outstanding work.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationDomainError::InvalidTransition`] when the cause
    /// does not fit the current state.
    pub fn escalate(
        self,
        reason: impl Into<String>,
        cause: EscalationCause,
        clock: &impl Clock,
    ) -> Result<Self, DelegationDomainError> {
        let permitted = match cause {
            EscalationCause::Requested => matches!(
                self.state,
                DelegationState::Failed | DelegationState::TimedOut
            ),
            EscalationCause::Cancelled => self.state.is_outstanding(),
        };
        if !permitted {
            return Err(self.refuse(DelegationState::Escalated));
        }
        let mut escalated = self.move_to(DelegationState::Escalated, clock)?;
        escalated.escalation = Some(Escalation {
            reason: reason.into(),
            cause,
        });
        Ok(escalated)
    }

    const fn refuse(&self, target: DelegationState) -> DelegationDomainError {
        DelegationDomainError::InvalidTransition {
            handle: self.handle,
            from: self.state,
            to: target,
        }
    }

    fn move_to(
        mut self,
        target: DelegationState,
        clock: &impl Clock,
    ) -> Result<Self, DelegationDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(self.refuse(target));
        }
        self.state = target;
        self.updated_at = clock.utc();
        Ok(self)
    }
}
