//! Delegation ports.

mod actor;
mod repository;

pub use actor::{DelegateActor, OutcomeReporter};
pub use repository::{DelegationRepository, DelegationRepositoryError, DelegationRepositoryResult};
