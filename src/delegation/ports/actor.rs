//! Contracts between the coordinator and delegate actors.

use crate::delegation::domain::{Confidence, Delegation, DelegationHandle, Outcome};
use crate::delegation::error::DelegationResult;
use crate::record::domain::ActorId;
use async_trait::async_trait;
use std::sync::Arc;

/// A delegate that receives work directly from the coordinator.
///
/// Actors without a registered implementation are reached by an external
/// collaborator, which relays their calls through the coordinator API.
#[async_trait]
pub trait DelegateActor: Send + Sync {
    /// Identifier delegations are addressed to.
    fn id(&self) -> &ActorId;

    /// Receives new work.
    ///
    /// The actor answers through `reporter`, now or later, from any task.
    ///
    /// # Errors
    ///
    /// Returns a reason when the work cannot be taken; the delegation is then
    /// marked failed.
    async fn on_delegated(
        &self,
        delegation: Delegation,
        reporter: Arc<dyn OutcomeReporter>,
    ) -> Result<(), String>;
}

/// The coordinator operations available to delegates.
#[async_trait]
pub trait OutcomeReporter: Send + Sync {
    /// Acknowledges a delegation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::delegation::error::DelegationError`] when the
    /// coordinator refuses the call.
    async fn accept(&self, handle: DelegationHandle) -> DelegationResult<()>;

    /// Signals that work has started.
    ///
    /// # Errors
    ///
    /// Returns [`crate::delegation::error::DelegationError`] when the
    /// coordinator refuses the call.
    async fn start(&self, handle: DelegationHandle) -> DelegationResult<()>;

    /// Reports an outcome.
    ///
    /// # Errors
    ///
    /// Returns [`crate::delegation::error::DelegationError`] when the
    /// coordinator refuses the call, including
    /// [`crate::delegation::error::DelegationError::DelegationTimedOut`]
    /// after the deadline.
    async fn report(
        &self,
        handle: DelegationHandle,
        outcome: Outcome,
        confidence: Option<Confidence>,
    ) -> DelegationResult<()>;
}
