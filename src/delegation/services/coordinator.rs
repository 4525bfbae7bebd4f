//! Delegation coordinator: hands records to delegates and applies outcomes.

use crate::delegation::domain::{
    Confidence, Delegation, DelegationEvent, DelegationHandle, DelegationParams, DelegationState,
    EscalationCause, Outcome,
};
use crate::delegation::error::{DelegationError, DelegationResult};
use crate::delegation::ports::{
    DelegateActor, DelegationRepository, DelegationRepositoryError, OutcomeReporter,
};
use crate::lifecycle::domain::Finding;
use crate::lifecycle::ports::ArchiveHook;
use crate::lifecycle::services::{
    LifecycleEngine, LifecycleError, LifecycleResult, TransitionOutcome, TransitionRequest,
};
use crate::record::domain::{ActorId, LogEntry, Record, RecordId, RecordStatus};
use crate::store::ports::RecordRepository;
use crate::store::services::{RecordStoreError, TaskStore};
use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tracing::{debug, error, info, warn};

/// Receiving end of the coordinator's event channel.
pub type DelegationEvents = mpsc::UnboundedReceiver<DelegationEvent>;

const MAX_ADVANCE_ATTEMPTS: usize = 3;

/// Parameters of [`DelegationCoordinator::delegate`].
#[derive(Debug, Clone, PartialEq)]
pub struct DelegateRequest {
    /// Record to delegate.
    pub task_id: RecordId,
    /// Delegate actor.
    pub to_actor: ActorId,
    /// Opaque instructions passed to the delegate.
    pub instructions: serde_json::Value,
    /// Time allowed for an outcome.
    pub timeout: TimeDelta,
}

impl DelegateRequest {
    /// Creates a request with empty instructions.
    #[must_use]
    pub const fn new(task_id: RecordId, to_actor: ActorId, timeout: TimeDelta) -> Self {
        Self {
            task_id,
            to_actor,
            instructions: serde_json::Value::Null,
            timeout,
        }
    }

    /// Attaches instructions for the delegate.
    #[must_use]
    pub fn with_instructions(self, instructions: serde_json::Value) -> Self {
        Self {
            instructions,
            ..self
        }
    }
}

/// What a completed delegation did to its record.
#[derive(Debug, Clone)]
pub enum Advancement {
    /// The record moved forward.
    Advanced {
        /// Status before the outcome.
        from: RecordStatus,
        /// Status after the outcome.
        to: RecordStatus,
    },
    /// A gate asked for review before the record could move on.
    AwaitingReview(Vec<Finding>),
    /// The lifecycle engine refused to move the record.
    Blocked(LifecycleError),
    /// The record was already at or past review, or the outcome was a
    /// failure.
    Unchanged,
}

/// Result of [`DelegationCoordinator::report`].
#[derive(Debug, Clone)]
pub struct ReportReceipt {
    /// The delegation after the outcome was applied.
    pub delegation: Delegation,
    /// Effect on the delegated record.
    pub advancement: Advancement,
}

/// Coordinates delegations of records to delegate actors.
///
/// Delegation state changes are serialized by a coordinator-wide lock; the
/// lock is never held while calling into delegate actors or the lifecycle
/// engine. Every state change is persisted before it is announced on the
/// event channel.
pub struct DelegationCoordinator<R, D, C>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    this: Weak<Self>,
    engine: Arc<LifecycleEngine<R, C>>,
    repository: Arc<D>,
    coordinator: ActorId,
    actors: RwLock<HashMap<ActorId, Arc<dyn DelegateActor>>>,
    events: mpsc::UnboundedSender<DelegationEvent>,
    state_lock: Mutex<()>,
}

fn poisoned(err: impl ToString) -> DelegationError {
    DelegationRepositoryError::persistence(std::io::Error::other(err.to_string())).into()
}

fn path_to_review(status: RecordStatus) -> &'static [RecordStatus] {
    match status {
        RecordStatus::ToDo | RecordStatus::Blocked => {
            &[RecordStatus::InProgress, RecordStatus::Review]
        }
        RecordStatus::InProgress => &[RecordStatus::Review],
        RecordStatus::Review | RecordStatus::Done | RecordStatus::Archived => &[],
    }
}

fn event_for(delegation: &Delegation) -> DelegationEvent {
    let handle = delegation.handle;
    let task_id = delegation.task_id.clone();
    match delegation.state {
        DelegationState::Pending => DelegationEvent::Delegated {
            handle,
            task_id,
            to_actor: delegation.to_actor.clone(),
        },
        DelegationState::Accepted => DelegationEvent::Accepted { handle },
        DelegationState::InProgress => DelegationEvent::Started { handle },
        DelegationState::Completed => DelegationEvent::Completed {
            handle,
            task_id,
            confidence: delegation.confidence,
        },
        DelegationState::Failed => DelegationEvent::Failed {
            handle,
            task_id,
            reason: delegation.failure_reason.clone().unwrap_or_default(),
        },
        DelegationState::TimedOut => DelegationEvent::TimedOut { handle, task_id },
        DelegationState::Escalated => DelegationEvent::Escalated {
            handle,
            task_id,
            cause: delegation
                .escalation
                .as_ref()
                .map_or(EscalationCause::Requested, |escalation| escalation.cause),
        },
    }
}

/// Renders the outcome part of a delegation log entry.
fn describe_outcome(delegation: &Delegation) -> String {
    let confidence = delegation
        .confidence
        .map(|value| format!(" (confidence {value})"))
        .unwrap_or_default();
    match delegation.state {
        DelegationState::Completed => format!("completed{confidence}"),
        DelegationState::Failed => format!(
            "failed{confidence}: {}",
            delegation.failure_reason.as_deref().unwrap_or("no reason given")
        ),
        DelegationState::Escalated => delegation.escalation.as_ref().map_or_else(
            || "escalated".to_owned(),
            |escalation| format!("escalated ({}): {}", escalation.cause, escalation.reason),
        ),
        other => other.as_str().replace('_', " "),
    }
}

impl<R, D, C> DelegationCoordinator<R, D, C>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a coordinator acting as `coordinator` and registers it as an
    /// archive hook of `engine`.
    ///
    /// Returns the coordinator together with the receiving end of its event
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Lifecycle`] when the hook cannot be
    /// registered.
    pub fn new(
        engine: Arc<LifecycleEngine<R, C>>,
        repository: Arc<D>,
        coordinator: ActorId,
    ) -> DelegationResult<(Arc<Self>, DelegationEvents)> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let created = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            engine,
            repository,
            coordinator,
            actors: RwLock::new(HashMap::new()),
            events: sender,
            state_lock: Mutex::new(()),
        });
        let hook: Weak<dyn ArchiveHook> = Arc::<Self>::downgrade(&created);
        created.engine.register_archive_hook(hook)?;
        Ok((created, receiver))
    }

    /// Returns the coordinating actor.
    #[must_use]
    pub const fn coordinator(&self) -> &ActorId {
        &self.coordinator
    }

    /// Returns the lifecycle engine outcomes are applied through.
    #[must_use]
    pub const fn engine(&self) -> &Arc<LifecycleEngine<R, C>> {
        &self.engine
    }

    /// Registers a delegate that receives work directly.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Repository`] when the actor table lock is
    /// poisoned.
    pub fn register_actor(&self, actor: Arc<dyn DelegateActor>) -> DelegationResult<()> {
        let mut actors = self.actors.write().map_err(poisoned)?;
        actors.insert(actor.id().clone(), actor);
        Ok(())
    }

    /// Hands a record to a delegate.
    ///
    /// A registered delegate receives the work before this returns; if it
    /// refuses, the delegation is marked failed. Other delegates are reached
    /// by external delivery.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::InvalidTimeout`] for non-positive timeouts,
    /// [`DelegationError::TaskNotFound`] for unknown records and
    /// [`DelegationError::TaskNotDelegatable`] for done or archived records.
    pub async fn delegate(&self, request: DelegateRequest) -> DelegationResult<Delegation> {
        if request.timeout <= TimeDelta::zero() {
            return Err(DelegationError::InvalidTimeout);
        }
        let record = self.store().get(&request.task_id).await.map_err(|err| match err {
            RecordStoreError::TaskNotFound(id) => DelegationError::TaskNotFound(id),
            other => other.into(),
        })?;
        if matches!(record.status(), RecordStatus::Done | RecordStatus::Archived) {
            return Err(DelegationError::TaskNotDelegatable {
                id: request.task_id,
                status: record.status(),
            });
        }

        let params = DelegationParams {
            task_id: request.task_id,
            from_actor: self.coordinator.clone(),
            to_actor: request.to_actor,
            instructions: request.instructions,
            timeout: request.timeout,
        };
        let delegation = Delegation::new(params, self.clock());
        self.repository.insert(&delegation).await?;
        info!(
            handle = %delegation.handle,
            task = %delegation.task_id,
            delegate = %delegation.to_actor,
            deadline = %delegation.deadline,
            "record delegated"
        );
        self.emit(event_for(&delegation));
        self.dispatch(delegation).await
    }

    /// Records the delegate's acknowledgement. Accepting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::NotFound`],
    /// [`DelegationError::DelegationTimedOut`] past the deadline, or
    /// [`DelegationError::InvalidTransition`] once the delegation ended.
    pub async fn accept(&self, handle: DelegationHandle) -> DelegationResult<Delegation> {
        let guard = self.state_lock.lock().await;
        let current = self.load(handle).await?;
        if current.is_overdue(self.clock().utc()) {
            return Err(self.reject_overdue(guard, current).await);
        }
        if matches!(
            current.state,
            DelegationState::Accepted | DelegationState::InProgress
        ) {
            return Ok(current);
        }
        let accepted = current.accept(self.clock())?;
        self.repository.update(&accepted).await?;
        drop(guard);
        debug!(handle = %handle, "delegation accepted");
        self.emit(event_for(&accepted));
        Ok(accepted)
    }

    /// Records that the delegate started working. Starting twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::NotFound`],
    /// [`DelegationError::DelegationTimedOut`] past the deadline, or
    /// [`DelegationError::InvalidTransition`] unless accepted.
    pub async fn start(&self, handle: DelegationHandle) -> DelegationResult<Delegation> {
        let guard = self.state_lock.lock().await;
        let current = self.load(handle).await?;
        if current.is_overdue(self.clock().utc()) {
            return Err(self.reject_overdue(guard, current).await);
        }
        if current.state == DelegationState::InProgress {
            return Ok(current);
        }
        let started = current.start(self.clock())?;
        self.repository.update(&started).await?;
        drop(guard);
        debug!(handle = %handle, "delegation started");
        self.emit(event_for(&started));
        Ok(started)
    }

    /// Applies a delegate's outcome.
    ///
    /// A completed outcome advances the record toward review through the
    /// lifecycle engine; a failure is recorded without touching the record's
    /// status. Either way a log entry is appended to the record.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::NotFound`],
    /// [`DelegationError::DelegationTimedOut`] when the outcome arrives at or
    /// after the deadline (the delegation is timed out), or
    /// [`DelegationError::InvalidTransition`] unless accepted or in progress.
    /// Once the outcome is recorded, problems moving the record are reported
    /// through [`ReportReceipt::advancement`] rather than as errors.
    pub async fn report(
        &self,
        handle: DelegationHandle,
        outcome: Outcome,
        confidence: Option<Confidence>,
    ) -> DelegationResult<ReportReceipt> {
        let guard = self.state_lock.lock().await;
        let current = self.load(handle).await?;
        if current.is_overdue(self.clock().utc()) {
            return Err(self.reject_overdue(guard, current).await);
        }
        let reported = current.report(outcome, confidence, self.clock())?;
        self.repository.update(&reported).await?;
        drop(guard);

        info!(
            handle = %handle,
            task = %reported.task_id,
            state = %reported.state,
            confidence = reported.confidence.map(Confidence::value),
            "delegation outcome reported"
        );
        self.emit(event_for(&reported));
        self.append_log(&reported, &reported.to_actor).await;

        let advancement = if reported.state == DelegationState::Completed {
            self.advance_record(&reported).await
        } else {
            Advancement::Unchanged
        };
        Ok(ReportReceipt {
            delegation: reported,
            advancement,
        })
    }

    /// Hands a failed or timed-out delegation back to the coordinator.
    ///
    /// Overdue work is timed out first. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::NotFound`] or
    /// [`DelegationError::InvalidTransition`] unless failed or timed out.
    pub async fn escalate(
        &self,
        handle: DelegationHandle,
        reason: impl Into<String> + Send,
    ) -> DelegationResult<Delegation> {
        let guard = self.state_lock.lock().await;
        let mut current = self.load(handle).await?;
        let mut timed_out = None;
        if current.is_overdue(self.clock().utc()) {
            current = self.persist_timeout(current).await?;
            timed_out = Some(current.clone());
        }
        let escalated = current.escalate(reason, EscalationCause::Requested, self.clock())?;
        self.repository.update(&escalated).await?;
        drop(guard);

        if let Some(expired) = timed_out {
            self.append_log(&expired, &self.coordinator).await;
        }
        self.announce_escalation(&escalated).await;
        Ok(escalated)
    }

    /// Escalates every outstanding delegation of a record as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Repository`] when delegations cannot be
    /// read or written.
    pub async fn cancel_all(
        &self,
        task_id: &RecordId,
        reason: &str,
    ) -> DelegationResult<Vec<Delegation>> {
        let mut cancelled = Vec::new();
        for candidate in self.repository.list_for_task(task_id).await? {
            if !candidate.state.is_outstanding() {
                continue;
            }
            let guard = self.state_lock.lock().await;
            let current = self.load(candidate.handle).await?;
            if !current.state.is_outstanding() {
                continue;
            }
            let escalated = current.escalate(reason, EscalationCause::Cancelled, self.clock())?;
            self.repository.update(&escalated).await?;
            drop(guard);
            self.announce_escalation(&escalated).await;
            cancelled.push(escalated);
        }
        Ok(cancelled)
    }

    /// Times out every outstanding delegation whose deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Repository`] when delegations cannot be
    /// read or written.
    pub async fn expire_overdue(&self) -> DelegationResult<Vec<Delegation>> {
        let now = self.clock().utc();
        let mut expired = Vec::new();
        for candidate in self.repository.list_outstanding().await? {
            if !candidate.is_overdue(now) {
                continue;
            }
            let guard = self.state_lock.lock().await;
            let current = self.load(candidate.handle).await?;
            if !current.is_overdue(self.clock().utc()) {
                continue;
            }
            let timed_out = self.persist_timeout(current).await?;
            drop(guard);
            self.append_log(&timed_out, &self.coordinator).await;
            expired.push(timed_out);
        }
        Ok(expired)
    }

    /// Returns a delegation by handle, timing it out first when its
    /// deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::NotFound`] when the handle is unknown.
    pub async fn get(&self, handle: DelegationHandle) -> DelegationResult<Delegation> {
        let guard = self.state_lock.lock().await;
        let current = self.load(handle).await?;
        if !current.is_overdue(self.clock().utc()) {
            return Ok(current);
        }
        let timed_out = self.persist_timeout(current).await?;
        drop(guard);
        self.append_log(&timed_out, &self.coordinator).await;
        Ok(timed_out)
    }

    /// Returns every delegation of a record, oldest first. Overdue
    /// delegations are timed out before the listing is read.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Repository`] when the repository fails.
    pub async fn list_for_task(&self, task_id: &RecordId) -> DelegationResult<Vec<Delegation>> {
        self.expire_overdue().await?;
        Ok(self.repository.list_for_task(task_id).await?)
    }

    /// Returns every delegation still owing an outcome, oldest first.
    /// Overdue delegations are timed out before the listing is read.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Repository`] when the repository fails.
    pub async fn list_outstanding(&self) -> DelegationResult<Vec<Delegation>> {
        self.expire_overdue().await?;
        Ok(self.repository.list_outstanding().await?)
    }

    fn store(&self) -> &TaskStore<R, C> {
        self.engine.store()
    }

    fn clock(&self) -> &C {
        self.store().clock()
    }

    fn emit(&self, event: DelegationEvent) {
        if self.events.send(event).is_err() {
            debug!("delegation event receiver dropped");
        }
    }

    async fn load(&self, handle: DelegationHandle) -> DelegationResult<Delegation> {
        self.repository
            .find(handle)
            .await?
            .ok_or(DelegationError::NotFound(handle))
    }

    fn registered_actor(&self, id: &ActorId) -> DelegationResult<Option<Arc<dyn DelegateActor>>> {
        let actors = self.actors.read().map_err(poisoned)?;
        Ok(actors.get(id).cloned())
    }

    async fn dispatch(&self, delegation: Delegation) -> DelegationResult<Delegation> {
        let handle = delegation.handle;
        let (Some(actor), Some(reporter)) = (
            self.registered_actor(&delegation.to_actor)?,
            self.this.upgrade(),
        ) else {
            debug!(handle = %handle, "awaiting external delivery");
            return Ok(delegation);
        };
        let outcomes: Arc<dyn OutcomeReporter> = reporter;
        if let Err(reason) = actor.on_delegated(delegation, outcomes).await {
            warn!(handle = %handle, %reason, "delegate refused work");
            return self.mark_undeliverable(handle, reason).await;
        }
        self.load(handle).await
    }

    async fn mark_undeliverable(
        &self,
        handle: DelegationHandle,
        reason: String,
    ) -> DelegationResult<Delegation> {
        let guard = self.state_lock.lock().await;
        let current = self.load(handle).await?;
        if !current.state.is_outstanding() {
            return Ok(current);
        }
        let failed = current.fail(reason, self.clock())?;
        self.repository.update(&failed).await?;
        drop(guard);
        self.emit(event_for(&failed));
        self.append_log(&failed, &self.coordinator).await;
        Ok(failed)
    }

    /// Times out an overdue delegation while the state lock is held.
    async fn persist_timeout(&self, overdue: Delegation) -> DelegationResult<Delegation> {
        let timed_out = overdue.time_out(self.clock())?;
        self.repository.update(&timed_out).await?;
        warn!(
            handle = %timed_out.handle,
            task = %timed_out.task_id,
            delegate = %timed_out.to_actor,
            deadline = %timed_out.deadline,
            "delegation timed out"
        );
        self.emit(event_for(&timed_out));
        Ok(timed_out)
    }

    async fn reject_overdue(&self, guard: MutexGuard<'_, ()>, overdue: Delegation) -> DelegationError {
        let handle = overdue.handle;
        match self.persist_timeout(overdue).await {
            Ok(timed_out) => {
                drop(guard);
                self.append_log(&timed_out, &self.coordinator).await;
                DelegationError::DelegationTimedOut(handle)
            }
            Err(err) => err,
        }
    }

    async fn announce_escalation(&self, escalated: &Delegation) {
        warn!(
            handle = %escalated.handle,
            task = %escalated.task_id,
            reason = escalated.escalation.as_ref().map(|escalation| escalation.reason.as_str()),
            "delegation escalated"
        );
        self.emit(event_for(escalated));
        self.append_log(escalated, &self.coordinator).await;
    }

    /// Appends a delegation log entry to the record, retrying lost races.
    async fn append_log(&self, delegation: &Delegation, actor: &ActorId) {
        let entry = LogEntry::delegation(
            self.clock().utc(),
            actor.clone(),
            delegation.handle.to_string(),
            delegation.to_actor.clone(),
            describe_outcome(delegation),
        );
        let mut attempts = 0;
        loop {
            attempts += 1;
            let appended = self
                .store()
                .update(&delegation.task_id, |record: Record| record.with_log_entry(&entry))
                .await;
            match appended {
                Ok(_) => return,
                Err(err) if err.is_concurrent_modification() && attempts < MAX_ADVANCE_ATTEMPTS => {
                    debug!(task = %delegation.task_id, attempts, "retrying delegation log entry");
                }
                Err(RecordStoreError::TaskNotFound(id)) => {
                    warn!(task = %id, handle = %delegation.handle, "delegated record is gone; log entry dropped");
                    return;
                }
                Err(err) => {
                    error!(
                        task = %delegation.task_id,
                        handle = %delegation.handle,
                        error = %err,
                        "failed to append delegation log entry"
                    );
                    return;
                }
            }
        }
    }

    /// Moves the record of a completed delegation toward review.
    async fn advance_record(&self, delegation: &Delegation) -> Advancement {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_advance(delegation).await {
                Ok(advancement) => return advancement,
                Err(err) if err.is_concurrent_modification() && attempts < MAX_ADVANCE_ATTEMPTS => {
                    debug!(task = %delegation.task_id, attempts, "retrying record advancement");
                }
                Err(err) => {
                    warn!(
                        task = %delegation.task_id,
                        handle = %delegation.handle,
                        error = %err,
                        "completed delegation could not advance its record"
                    );
                    return Advancement::Blocked(err);
                }
            }
        }
    }

    async fn try_advance(&self, delegation: &Delegation) -> LifecycleResult<Advancement> {
        let from = self.store().get(&delegation.task_id).await?.status();
        let mut reached = None;
        for step in path_to_review(from) {
            let request = TransitionRequest::new(
                delegation.task_id.clone(),
                *step,
                delegation.to_actor.clone(),
            );
            match self.engine.transition(request).await? {
                TransitionOutcome::Applied(_) => reached = Some(*step),
                TransitionOutcome::AwaitingReview { findings, .. } => {
                    return Ok(Advancement::AwaitingReview(findings));
                }
            }
        }
        Ok(reached.map_or(Advancement::Unchanged, |to| Advancement::Advanced { from, to }))
    }
}

#[async_trait]
impl<R, D, C> OutcomeReporter for DelegationCoordinator<R, D, C>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn accept(&self, handle: DelegationHandle) -> DelegationResult<()> {
        Self::accept(self, handle).await.map(|_| ())
    }

    async fn start(&self, handle: DelegationHandle) -> DelegationResult<()> {
        Self::start(self, handle).await.map(|_| ())
    }

    async fn report(
        &self,
        handle: DelegationHandle,
        outcome: Outcome,
        confidence: Option<Confidence>,
    ) -> DelegationResult<()> {
        Self::report(self, handle, outcome, confidence)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl<R, D, C> ArchiveHook for DelegationCoordinator<R, D, C>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn record_archived(&self, record: &Record) {
        match self.cancel_all(record.id(), "record archived").await {
            Ok(cancelled) if !cancelled.is_empty() => {
                info!(task = %record.id(), cancelled = cancelled.len(), "cancelled delegations of archived record");
            }
            Ok(_) => {}
            Err(err) => {
                error!(task = %record.id(), error = %err, "failed to cancel delegations of archived record");
            }
        }
    }
}
