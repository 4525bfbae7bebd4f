//! Task store: validated, concurrency-safe access to records.

use crate::record::domain::{Record, RecordDomainError, RecordId, RecordStatus};
use crate::store::graph::{CycleDetected, DependencyGraph};
use crate::store::ports::{RecordRepository, RecordRepositoryError};
use crate::store::query::RecordQuery;
use mockable::Clock;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Service-level errors for task store operations.
#[derive(Debug, Clone, Error)]
pub enum RecordStoreError {
    /// No record has the requested identifier.
    #[error("task not found: {0}")]
    TaskNotFound(RecordId),

    /// The write would introduce a dependency cycle.
    #[error(transparent)]
    CycleDetected(#[from] CycleDetected),

    /// A dependency names a record that does not exist.
    #[error("record {id} depends on unknown record {dependency}")]
    UnknownDependency {
        /// Record being written.
        id: RecordId,
        /// Missing dependency.
        dependency: RecordId,
    },

    /// The parent is neither stored nor tombstoned.
    #[error("record {id} names unresolved parent {parent}")]
    UnresolvedParent {
        /// Record being written.
        id: RecordId,
        /// Parent identifier.
        parent: RecordId,
    },

    /// An update changed a field the store owns.
    #[error("invalid mutation of record {id}: {reason}")]
    InvalidMutation {
        /// Record being updated.
        id: RecordId,
        /// Which rule the mutation broke.
        reason: &'static str,
    },

    /// A tombstone was requested for a record that still exists.
    #[error("record {0} still exists and cannot be tombstoned")]
    TombstoneLive(RecordId),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] RecordDomainError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RecordRepositoryError),
}

impl RecordStoreError {
    /// Returns `true` when the caller may retry after re-reading the record.
    #[must_use]
    pub const fn is_concurrent_modification(&self) -> bool {
        matches!(
            self,
            Self::Repository(RecordRepositoryError::ConcurrentModification { .. })
        )
    }
}

/// Result type for task store operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

/// Structural problems found by [`TaskStore::integrity_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    /// A record's parent is neither stored nor tombstoned.
    MissingParent {
        /// Child record.
        child: RecordId,
        /// Unresolved parent.
        parent: RecordId,
    },
    /// A live record hangs off an archived parent.
    ArchivedParent {
        /// Child record.
        child: RecordId,
        /// Archived parent.
        parent: RecordId,
    },
    /// A dependency points at a record that does not exist.
    DanglingDependency {
        /// Dependent record.
        record: RecordId,
        /// Missing dependency.
        dependency: RecordId,
    },
    /// Stored documents form a dependency cycle.
    DependencyCycle {
        /// Records along the cycle.
        path: Vec<RecordId>,
    },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParent { child, parent } => {
                write!(f, "{child}: parent {parent} does not exist")
            }
            Self::ArchivedParent { child, parent } => {
                write!(f, "{child}: parent {parent} is archived")
            }
            Self::DanglingDependency { record, dependency } => {
                write!(f, "{record}: dependency {dependency} does not exist")
            }
            Self::DependencyCycle { path } => {
                let rendered: Vec<&str> = path.iter().map(RecordId::as_str).collect();
                write!(f, "dependency cycle: {}", rendered.join(" -> "))
            }
        }
    }
}

/// Record store enforcing identity, hierarchy and dependency invariants.
///
/// Reads go straight to the repository and never wait on each other. Writes
/// pass through a store-wide gate so that checks spanning several records,
/// such as cycle detection, see a stable graph. Updates are additionally
/// guarded by the record revision: a write based on a stale snapshot fails
/// with a concurrent-modification error.
pub struct TaskStore<R, C>
where
    R: RecordRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    write_gate: Mutex<()>,
    tombstones: RwLock<BTreeSet<RecordId>>,
}

impl<R, C> TaskStore<R, C>
where
    R: RecordRepository,
    C: Clock + Send + Sync,
{
    /// Creates a store over `repository`.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            write_gate: Mutex::new(()),
            tombstones: RwLock::new(BTreeSet::new()),
        }
    }

    /// Seeds the store with identifiers known to be intentionally removed.
    #[must_use]
    pub fn with_tombstones(self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        let seeded = ids.into_iter().collect();
        Self {
            tombstones: RwLock::new(seeded),
            ..self
        }
    }

    /// Returns the underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Returns the store clock.
    #[must_use]
    pub const fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// Stores a new record.
    ///
    /// The parent must resolve, every dependency must exist, and the
    /// dependency graph must stay acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Repository`] wrapping
    /// [`RecordRepositoryError::DuplicateId`] when the identifier is taken,
    /// or a validation error when an invariant would break.
    pub async fn create(&self, mut record: Record) -> RecordStoreResult<Record> {
        record.validate()?;
        let _gate = self.write_gate.lock().await;
        if self.repository.find_by_id(record.id()).await?.is_some() {
            return Err(RecordRepositoryError::DuplicateId(record.id().clone()).into());
        }
        self.check_references(&record, None).await?;
        record.stamp_create();
        self.repository.insert(&record).await?;
        info!(
            id = %record.id(),
            kind = %record.kind(),
            "record created"
        );
        Ok(record)
    }

    /// Retrieves a record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TaskNotFound`] when absent.
    pub async fn get(&self, id: &RecordId) -> RecordStoreResult<Record> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| RecordStoreError::TaskNotFound(id.clone()))
    }

    /// Applies `mutator` to a snapshot of the record and commits the result.
    ///
    /// The mutator may change any field except the identifier and the
    /// status; status changes go through the lifecycle engine. The write
    /// succeeds only if nobody else committed since the snapshot was read.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TaskNotFound`] when absent,
    /// [`RecordStoreError::InvalidMutation`] when the mutator touched the
    /// identifier or status, a validation error when an invariant would
    /// break, and [`RecordRepositoryError::ConcurrentModification`] when the
    /// snapshot is stale.
    pub async fn update<F>(&self, id: &RecordId, mutator: F) -> RecordStoreResult<Record>
    where
        F: FnOnce(Record) -> Record + Send,
    {
        let snapshot = self.get(id).await?;
        let proposed = mutator(snapshot.clone());
        if proposed.id() != snapshot.id() {
            return Err(RecordStoreError::InvalidMutation {
                id: id.clone(),
                reason: "the identifier is immutable",
            });
        }
        if proposed.status() != snapshot.status() {
            return Err(RecordStoreError::InvalidMutation {
                id: id.clone(),
                reason: "status changes must go through the lifecycle engine",
            });
        }
        self.commit(&snapshot, proposed).await
    }

    /// Commits `proposed` over `snapshot` without the status guard.
    pub(crate) async fn commit(
        &self,
        snapshot: &Record,
        mut proposed: Record,
    ) -> RecordStoreResult<Record> {
        proposed.validate()?;
        let _gate = self.write_gate.lock().await;
        self.check_references(&proposed, Some(snapshot)).await?;
        proposed.stamp_commit(snapshot, &*self.clock);
        self.repository
            .replace(&proposed, snapshot.revision())
            .await?;
        debug!(
            id = %proposed.id(),
            revision = proposed.revision(),
            "record committed"
        );
        Ok(proposed)
    }

    /// Returns every record, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Repository`] when the repository fails.
    pub async fn list(&self) -> RecordStoreResult<Vec<Record>> {
        Ok(self.repository.list().await?)
    }

    /// Returns the records accepted by `predicate`, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Repository`] when the repository fails.
    pub async fn query<P>(&self, predicate: P) -> RecordStoreResult<Vec<Record>>
    where
        P: Fn(&Record) -> bool + Send,
    {
        let records = self.repository.list().await?;
        Ok(records.into_iter().filter(|record| predicate(record)).collect())
    }

    /// Returns the records matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Repository`] when the repository fails.
    pub async fn find(&self, query: &RecordQuery) -> RecordStoreResult<Vec<Record>> {
        self.query(|record| query.matches(record)).await
    }

    /// Returns the direct children of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TaskNotFound`] when `id` is absent.
    pub async fn children(&self, id: &RecordId) -> RecordStoreResult<Vec<Record>> {
        self.get(id).await?;
        self.query(|record| record.parent() == Some(id)).await
    }

    /// Returns the records that directly depend on `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TaskNotFound`] when `id` is absent.
    pub async fn dependents(&self, id: &RecordId) -> RecordStoreResult<Vec<Record>> {
        self.get(id).await?;
        self.query(|record| record.depends_on().contains(id)).await
    }

    /// Returns everything `id` transitively depends on, dependencies first.
    ///
    /// Dependencies that no longer exist are left out.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TaskNotFound`] when `id` is absent and
    /// [`RecordStoreError::CycleDetected`] when stored data contains a cycle.
    pub async fn dependency_closure(&self, id: &RecordId) -> RecordStoreResult<Vec<Record>> {
        self.get(id).await?;
        let records = self.repository.list().await?;
        let order = DependencyGraph::from_records(&records).closure(id)?;
        Ok(order
            .iter()
            .filter_map(|dependency| {
                records
                    .iter()
                    .find(|record| record.id() == dependency)
                    .cloned()
            })
            .collect())
    }

    /// Marks `id` as intentionally removed so children may keep naming it.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::TombstoneLive`] when the record exists.
    pub async fn tombstone(&self, id: &RecordId) -> RecordStoreResult<()> {
        let _gate = self.write_gate.lock().await;
        if self.repository.find_by_id(id).await?.is_some() {
            return Err(RecordStoreError::TombstoneLive(id.clone()));
        }
        self.tombstones
            .write()
            .map_err(|err| {
                RecordRepositoryError::persistence(std::io::Error::other(err.to_string()))
            })?
            .insert(id.clone());
        info!(id = %id, "record tombstoned");
        Ok(())
    }

    /// Returns whether `id` has been tombstoned.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Repository`] when the tombstone lock is
    /// poisoned.
    pub fn is_tombstoned(&self, id: &RecordId) -> RecordStoreResult<bool> {
        let tombstones = self.tombstones.read().map_err(|err| {
            RecordRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(tombstones.contains(id))
    }

    /// Scans every record for structural problems.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Repository`] when the repository fails.
    pub async fn integrity_report(&self) -> RecordStoreResult<Vec<IntegrityWarning>> {
        let records = self.repository.list().await?;
        let mut warnings = Vec::new();

        for record in &records {
            if let Some(parent_id) = record.parent() {
                let parent = records.iter().find(|candidate| candidate.id() == parent_id);
                let parent_status = parent.map(Record::status);
                if parent_status == Some(RecordStatus::Archived) && !record.status().is_terminal() {
                    warnings.push(IntegrityWarning::ArchivedParent {
                        child: record.id().clone(),
                        parent: parent_id.clone(),
                    });
                } else if parent.is_none() && !self.is_tombstoned(parent_id)? {
                    warnings.push(IntegrityWarning::MissingParent {
                        child: record.id().clone(),
                        parent: parent_id.clone(),
                    });
                }
            }
            for dependency in record.depends_on() {
                if !records.iter().any(|candidate| candidate.id() == dependency) {
                    warnings.push(IntegrityWarning::DanglingDependency {
                        record: record.id().clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let graph = DependencyGraph::from_records(&records);
        let mut reported: HashSet<BTreeSet<RecordId>> = HashSet::new();
        for record in &records {
            if let Err(cycle) = graph.closure(record.id()) {
                let members: BTreeSet<RecordId> = cycle.path.iter().cloned().collect();
                if reported.insert(members) {
                    warnings.push(IntegrityWarning::DependencyCycle { path: cycle.path });
                }
            }
        }

        Ok(warnings)
    }

    /// Validates parent, dependency existence and acyclicity for a write.
    ///
    /// When `previous` is given only references that changed are checked, so
    /// records inherited with stale links can still be edited.
    async fn check_references(
        &self,
        record: &Record,
        previous: Option<&Record>,
    ) -> RecordStoreResult<()> {
        let parent_changed = previous.is_none_or(|old| old.parent() != record.parent());
        let new_dependencies: Vec<&RecordId> = record
            .depends_on()
            .iter()
            .filter(|dependency| {
                previous.is_none_or(|old| !old.depends_on().contains(*dependency))
            })
            .collect();
        if !parent_changed && new_dependencies.is_empty() {
            return Ok(());
        }

        let records = self.repository.list().await?;
        let known: HashSet<&RecordId> = records
            .iter()
            .map(Record::id)
            .chain(std::iter::once(record.id()))
            .collect();

        if parent_changed && let Some(parent) = record.parent() {
            let resolved = parent != record.id()
                && (known.contains(parent) || self.is_tombstoned(parent)?);
            if !resolved {
                return Err(RecordStoreError::UnresolvedParent {
                    id: record.id().clone(),
                    parent: parent.clone(),
                });
            }
        }

        if let Some(missing) = new_dependencies
            .iter()
            .find(|dependency| !known.contains(**dependency))
        {
            return Err(RecordStoreError::UnknownDependency {
                id: record.id().clone(),
                dependency: (*missing).clone(),
            });
        }

        if !new_dependencies.is_empty() {
            DependencyGraph::from_records(&records)
                .with_record(record)
                .ensure_acyclic_from(record.id())?;
        }
        Ok(())
    }
}
