//! Notifications sent to the coordinating actor.

use super::{Confidence, DelegationHandle, EscalationCause};
use crate::record::domain::{ActorId, RecordId};

/// Something happened to a delegation.
#[derive(Debug, Clone, PartialEq)]
pub enum DelegationEvent {
    /// Work was handed to a delegate.
    Delegated {
        /// Delegation handle.
        handle: DelegationHandle,
        /// Record delegated.
        task_id: RecordId,
        /// Delegate actor.
        to_actor: ActorId,
    },
    /// The delegate acknowledged the work.
    Accepted {
        /// Delegation handle.
        handle: DelegationHandle,
    },
    /// The delegate started working.
    Started {
        /// Delegation handle.
        handle: DelegationHandle,
    },
    /// The delegate finished.
    Completed {
        /// Delegation handle.
        handle: DelegationHandle,
        /// Record delegated.
        task_id: RecordId,
        /// Reported confidence.
        confidence: Option<Confidence>,
    },
    /// The delegate failed or could not be reached.
    Failed {
        /// Delegation handle.
        handle: DelegationHandle,
        /// Record delegated.
        task_id: RecordId,
        /// Reported reason.
        reason: String,
    },
    /// No outcome arrived before the deadline.
    TimedOut {
        /// Delegation handle.
        handle: DelegationHandle,
        /// Record delegated.
        task_id: RecordId,
    },
    /// The delegation was handed back.
    Escalated {
        /// Delegation handle.
        handle: DelegationHandle,
        /// Record delegated.
        task_id: RecordId,
        /// What triggered it.
        cause: EscalationCause,
    },
}

impl DelegationEvent {
    /// Returns the handle the event concerns.
    #[must_use]
    pub const fn handle(&self) -> DelegationHandle {
        match self {
            Self::Delegated { handle, .. }
            | Self::Accepted { handle }
            | Self::Started { handle }
            | Self::Completed { handle, .. }
            | Self::Failed { handle, .. }
            | Self::TimedOut { handle, .. }
            | Self::Escalated { handle, .. } => *handle,
        }
    }
}
