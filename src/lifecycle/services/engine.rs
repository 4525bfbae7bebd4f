//! Lifecycle engine: validated, logged status transitions.

use crate::lifecycle::domain::{DecisionInputs, Finding, RejectionReason, TransitionDecision, decide};
use crate::lifecycle::ports::ArchiveHook;
use crate::lifecycle::services::GateRegistry;
use crate::record::domain::{ActorId, Record, RecordId, RecordStatus};
use crate::store::ports::{RecordRepository, RecordRepositoryError};
use crate::store::services::{RecordStoreError, TaskStore};
use mockable::Clock;
use std::sync::{Arc, RwLock, Weak};
use thiserror::Error;
use tracing::{info, warn};

/// Tunable lifecycle rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Also require done dependencies for `ToDo -> InProgress`.
    pub require_dependencies_to_start: bool,
}

/// A request to move a record to a new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Record to move.
    pub id: RecordId,
    /// Requested status.
    pub target: RecordStatus,
    /// Who is asking; recorded in the log entry.
    pub actor: ActorId,
    /// Permits `Archived -> ToDo`.
    pub allow_unarchive: bool,
}

impl TransitionRequest {
    /// Creates a request without the un-archive override.
    #[must_use]
    pub const fn new(id: RecordId, target: RecordStatus, actor: ActorId) -> Self {
        Self {
            id,
            target,
            actor,
            allow_unarchive: false,
        }
    }

    /// Grants the un-archive override.
    #[must_use]
    pub const fn with_unarchive_override(mut self) -> Self {
        self.allow_unarchive = true;
        self
    }
}

/// Successful result of [`LifecycleEngine::transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The transition was committed.
    Applied(Record),
    /// A gate asked for review; the record was left untouched.
    AwaitingReview {
        /// The unchanged record.
        record: Record,
        /// Why review is needed.
        findings: Vec<Finding>,
    },
}

impl TransitionOutcome {
    /// Returns the record carried by the outcome.
    #[must_use]
    pub const fn record(&self) -> &Record {
        match self {
            Self::Applied(record) | Self::AwaitingReview { record, .. } => record,
        }
    }
}

/// Errors returned by the lifecycle engine.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// The transition is not permitted from the current status.
    #[error("illegal transition of {id} from {from} to {to}: {reason}")]
    IllegalTransition {
        /// Record identifier.
        id: RecordId,
        /// Current status.
        from: RecordStatus,
        /// Requested status.
        to: RecordStatus,
        /// Why it was refused.
        reason: RejectionReason,
    },

    /// A validation gate failed.
    #[error("transition of {id} to {to} blocked by {} finding(s)", .findings.len())]
    ValidationBlocked {
        /// Record identifier.
        id: RecordId,
        /// Requested status.
        to: RecordStatus,
        /// Gate findings.
        findings: Vec<Finding>,
    },

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] RecordStoreError),
}

impl LifecycleError {
    /// Returns `true` when the transition lost a race and may be retried.
    #[must_use]
    pub const fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_concurrent_modification())
    }
}

impl From<RecordRepositoryError> for LifecycleError {
    fn from(err: RecordRepositoryError) -> Self {
        Self::Store(err.into())
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Applies status transitions through the task store.
///
/// Every transition is all-or-nothing: the decision is taken on a snapshot
/// and committed with the snapshot's revision, so a concurrent write makes
/// the transition fail rather than apply to a record nobody evaluated.
pub struct LifecycleEngine<R, C>
where
    R: RecordRepository,
    C: Clock + Send + Sync,
{
    store: Arc<TaskStore<R, C>>,
    gates: GateRegistry,
    policy: LifecyclePolicy,
    archive_hooks: RwLock<Vec<Weak<dyn ArchiveHook>>>,
}

impl<R, C> LifecycleEngine<R, C>
where
    R: RecordRepository,
    C: Clock + Send + Sync,
{
    /// Creates an engine with the default policy.
    #[must_use]
    pub fn new(store: Arc<TaskStore<R, C>>, gates: GateRegistry) -> Self {
        Self {
            store,
            gates,
            policy: LifecyclePolicy::default(),
            archive_hooks: RwLock::new(Vec::new()),
        }
    }

    /// Replaces the lifecycle policy.
    #[must_use]
    pub fn with_policy(self, policy: LifecyclePolicy) -> Self {
        Self { policy, ..self }
    }

    /// Returns the task store.
    #[must_use]
    pub const fn store(&self) -> &Arc<TaskStore<R, C>> {
        &self.store
    }

    /// Returns the active policy.
    #[must_use]
    pub const fn policy(&self) -> LifecyclePolicy {
        self.policy
    }

    /// Registers a hook notified after each archive transition.
    ///
    /// Hooks are held weakly; dropped hooks are skipped and pruned.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the hook list lock is poisoned.
    pub fn register_archive_hook(&self, hook: Weak<dyn ArchiveHook>) -> LifecycleResult<()> {
        self.archive_hooks
            .write()
            .map_err(|err| {
                RecordRepositoryError::persistence(std::io::Error::other(err.to_string()))
            })?
            .push(hook);
        Ok(())
    }

    /// Decides whether `record` may move to `target`, without side effects.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when dependencies cannot be read.
    pub async fn can_transition(
        &self,
        record: &Record,
        target: RecordStatus,
    ) -> LifecycleResult<TransitionDecision> {
        self.decide_for(record, target, false).await
    }

    /// Moves a record to a new status.
    ///
    /// On success the status changes, `updated_at` advances and a log entry
    /// naming the actor and both statuses is appended to the body.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::IllegalTransition`] for structurally
    /// impossible moves, [`LifecycleError::ValidationBlocked`] when a gate
    /// fails, and [`LifecycleError::Store`] when the record is missing or was
    /// modified concurrently. The record is untouched on every error.
    pub async fn transition(&self, request: TransitionRequest) -> LifecycleResult<TransitionOutcome> {
        let snapshot = self.store.get(&request.id).await?;
        let from = snapshot.status();
        let decision = self
            .decide_for(&snapshot, request.target, request.allow_unarchive)
            .await?;

        match decision {
            TransitionDecision::Allowed => {}
            TransitionDecision::Rejected(reason) => {
                warn!(
                    id = %request.id,
                    %from,
                    to = %request.target,
                    %reason,
                    "transition rejected"
                );
                return Err(LifecycleError::IllegalTransition {
                    id: request.id,
                    from,
                    to: request.target,
                    reason,
                });
            }
            TransitionDecision::Vetoed(findings) => {
                warn!(
                    id = %request.id,
                    to = %request.target,
                    findings = findings.len(),
                    "transition vetoed by validation gates"
                );
                return Err(LifecycleError::ValidationBlocked {
                    id: request.id,
                    to: request.target,
                    findings,
                });
            }
            TransitionDecision::NeedsReview(findings) => {
                info!(
                    id = %request.id,
                    to = %request.target,
                    findings = findings.len(),
                    "transition awaiting review"
                );
                return Ok(TransitionOutcome::AwaitingReview {
                    record: snapshot,
                    findings,
                });
            }
        }

        let mut updated = snapshot.clone();
        updated.apply_status(request.target, &request.actor, &**self.store.clock());
        let committed = self.store.commit(&snapshot, updated).await?;
        info!(
            id = %committed.id(),
            %from,
            to = %committed.status(),
            actor = %request.actor,
            "record transitioned"
        );

        if committed.status() == RecordStatus::Archived {
            self.notify_archived(&committed).await;
        }
        Ok(TransitionOutcome::Applied(committed))
    }

    async fn decide_for(
        &self,
        record: &Record,
        target: RecordStatus,
        allow_unarchive: bool,
    ) -> LifecycleResult<TransitionDecision> {
        let inputs = DecisionInputs {
            allow_unarchive,
            require_dependencies_to_start: self.policy.require_dependencies_to_start,
            unsatisfied_dependencies: self.unsatisfied_dependencies(record).await?,
        };
        Ok(decide(record, target, &inputs, || {
            self.gates.evaluate(record, target)
        }))
    }

    /// Lists dependencies that are not done; missing ones count as not done.
    async fn unsatisfied_dependencies(&self, record: &Record) -> LifecycleResult<Vec<RecordId>> {
        let mut unsatisfied = Vec::new();
        for dependency in record.depends_on() {
            let satisfied = self
                .store
                .repository()
                .find_by_id(dependency)
                .await?
                .is_some_and(|found| found.status().is_satisfied());
            if !satisfied {
                unsatisfied.push(dependency.clone());
            }
        }
        Ok(unsatisfied)
    }

    async fn notify_archived(&self, record: &Record) {
        let hooks: Vec<Arc<dyn ArchiveHook>> = match self.archive_hooks.write() {
            Ok(mut registered) => {
                registered.retain(|hook| hook.strong_count() > 0);
                registered.iter().filter_map(Weak::upgrade).collect()
            }
            Err(err) => {
                warn!(error = %err, "archive hook list is poisoned; skipping notification");
                Vec::new()
            }
        };
        for hook in hooks {
            hook.record_archived(record).await;
        }
    }
}
