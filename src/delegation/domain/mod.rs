//! Delegation domain model.

mod delegation;
mod error;
mod event;
mod handle;
mod state;

pub use delegation::{Confidence, Delegation, DelegationParams, Escalation, EscalationCause, Outcome};
pub use error::{DelegationDomainError, ParseDelegationStateError};
pub use event::DelegationEvent;
pub use handle::DelegationHandle;
pub use state::DelegationState;
