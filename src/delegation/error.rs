//! Error types for delegation coordination.

use crate::delegation::domain::{DelegationDomainError, DelegationHandle, DelegationState};
use crate::delegation::ports::DelegationRepositoryError;
use crate::lifecycle::services::LifecycleError;
use crate::record::domain::{RecordId, RecordStatus};
use crate::store::services::RecordStoreError;
use thiserror::Error;

/// Errors returned by the delegation coordinator.
#[derive(Debug, Clone, Error)]
pub enum DelegationError {
    /// The record to delegate does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(RecordId),

    /// The record's status does not allow delegation.
    #[error("task {id} cannot be delegated while {status}")]
    TaskNotDelegatable {
        /// Record identifier.
        id: RecordId,
        /// Current status.
        status: RecordStatus,
    },

    /// No delegation has the handle.
    #[error("delegation not found: {0}")]
    NotFound(DelegationHandle),

    /// The delegation state machine refused the call.
    #[error("delegation {handle} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Delegation handle.
        handle: DelegationHandle,
        /// Current state.
        from: DelegationState,
        /// Requested state.
        to: DelegationState,
    },

    /// The outcome arrived after the deadline; the delegation timed out.
    #[error("delegation {0} timed out")]
    DelegationTimedOut(DelegationHandle),

    /// Timeouts must be positive.
    #[error("delegation timeout must be positive")]
    InvalidTimeout,

    /// A domain value was invalid.
    #[error(transparent)]
    Domain(DelegationDomainError),

    /// Applying the outcome to the record failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Task store operation failed.
    #[error(transparent)]
    Store(#[from] RecordStoreError),

    /// Delegation persistence failed.
    #[error(transparent)]
    Repository(#[from] DelegationRepositoryError),
}

impl From<DelegationDomainError> for DelegationError {
    fn from(err: DelegationDomainError) -> Self {
        match err {
            DelegationDomainError::InvalidTransition { handle, from, to } => {
                Self::InvalidTransition { handle, from, to }
            }
            other => Self::Domain(other),
        }
    }
}

/// Result type for delegation operations.
pub type DelegationResult<T> = Result<T, DelegationError>;
