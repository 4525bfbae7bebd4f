//! Error types for the delegation domain.

use super::{DelegationHandle, DelegationState};
use thiserror::Error;

/// Errors raised by delegation state changes and value validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DelegationDomainError {
    /// The state machine does not allow the move.
    #[error("delegation {handle} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Delegation handle.
        handle: DelegationHandle,
        /// Current state.
        from: DelegationState,
        /// Requested state.
        to: DelegationState,
    },

    /// Confidence must lie in `[0, 1]`.
    #[error("confidence must be between 0 and 1, got {0}")]
    InvalidConfidence(String),

    /// The handle text is not a UUID.
    #[error("invalid delegation handle '{0}'")]
    InvalidHandle(String),
}

/// Error returned while parsing delegation states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown delegation state: {0}")]
pub struct ParseDelegationStateError(pub String);
