//! Assembly of one ledger instance.
//!
//! A [`Ledger`] owns a task store, the lifecycle engine in front of it and a
//! delegation coordinator, all configured from one [`LedgerConfig`]. Ledgers
//! share nothing, so a process may hold several.

use crate::clock::ManualClock;
use crate::config::LedgerConfig;
use crate::delegation::adapters::{InMemoryDelegationRepository, JsonFileDelegationRepository};
use crate::delegation::ports::DelegationRepository;
use crate::delegation::services::{DelegationCoordinator, DelegationEvents};
use crate::error::LedgerResult;
use crate::lifecycle::services::LifecycleEngine;
use crate::record::domain::{Record, RecordBuilder};
use crate::record::template::TemplateCatalog;
use crate::store::adapters::{FileSystemRecordRepository, InMemoryRecordRepository};
use crate::store::ports::RecordRepository;
use crate::store::services::TaskStore;
use chrono::TimeDelta;
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Ledger persisted under a directory with the wall clock.
pub type FileLedger =
    Ledger<FileSystemRecordRepository, JsonFileDelegationRepository, DefaultClock>;

/// Process-local ledger with an injected clock.
pub type MemoryLedger<C> = Ledger<InMemoryRecordRepository, InMemoryDelegationRepository, C>;

/// One independent ledger: store, lifecycle engine and delegation
/// coordinator.
pub struct Ledger<R, D, C>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    config: LedgerConfig,
    templates: TemplateCatalog,
    store: Arc<TaskStore<R, C>>,
    engine: Arc<LifecycleEngine<R, C>>,
    coordinator: Arc<DelegationCoordinator<R, D, C>>,
    events: Option<DelegationEvents>,
}

impl FileLedger {
    /// Opens the on-disk ledger described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LedgerError::Config`] for unusable settings
    /// and [`crate::error::LedgerError::Repository`] or
    /// [`crate::error::LedgerError::DelegationRepository`] when the ledger
    /// root cannot be opened or indexed.
    pub async fn open(config: LedgerConfig) -> LedgerResult<Self> {
        let records =
            FileSystemRecordRepository::open(config.root.clone(), config.path_strategy()?).await?;
        let delegations = JsonFileDelegationRepository::open(&config.root).await?;
        info!(
            root = %config.root,
            unreadable = records.unreadable_documents().len(),
            "opened ledger"
        );
        Self::assemble(
            config,
            Arc::new(records),
            Arc::new(delegations),
            Arc::new(DefaultClock),
        )
    }
}

impl<C> MemoryLedger<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates an empty process-local ledger.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LedgerError::Config`] for unusable settings.
    pub fn in_memory(config: LedgerConfig, clock: C) -> LedgerResult<Self> {
        Self::assemble(
            config,
            Arc::new(InMemoryRecordRepository::new()),
            Arc::new(InMemoryDelegationRepository::new()),
            Arc::new(clock),
        )
    }
}

impl<R, D, C> Ledger<R, D, C>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wires a ledger over the given repositories and clock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LedgerError::Config`] for unusable settings.
    pub fn assemble(
        config: LedgerConfig,
        records: Arc<R>,
        delegations: Arc<D>,
        clock: Arc<C>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        let store = Arc::new(TaskStore::new(records, clock).with_tombstones(config.tombstone_ids()?));
        let engine = Arc::new(
            LifecycleEngine::new(Arc::clone(&store), config.gate_registry()?)
                .with_policy(config.lifecycle_policy()),
        );
        let (coordinator, events) = DelegationCoordinator::new(
            Arc::clone(&engine),
            delegations,
            config.coordinator_actor()?,
        )?;
        Ok(Self {
            templates: config.template_catalog(),
            config,
            store,
            engine,
            coordinator,
            events: Some(events),
        })
    }

    /// Returns the configuration the ledger was built from.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Returns the task store.
    #[must_use]
    pub const fn store(&self) -> &Arc<TaskStore<R, C>> {
        &self.store
    }

    /// Returns the lifecycle engine.
    #[must_use]
    pub const fn engine(&self) -> &Arc<LifecycleEngine<R, C>> {
        &self.engine
    }

    /// Returns the delegation coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<DelegationCoordinator<R, D, C>> {
        &self.coordinator
    }

    /// Returns the body template catalog.
    #[must_use]
    pub const fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    /// Returns the configured default delegation timeout.
    #[must_use]
    pub fn default_timeout(&self) -> TimeDelta {
        self.config.default_timeout()
    }

    /// Takes the delegation event receiver. Only the first call returns it.
    pub const fn take_events(&mut self) -> Option<DelegationEvents> {
        self.events.take()
    }

    /// Creates a record, scaffolding its body from the template catalog
    /// when the builder carries none.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LedgerError::Template`] when the template
    /// fails to render, [`crate::error::LedgerError::Domain`] for an invalid
    /// record and [`crate::error::LedgerError::Store`] when the store
    /// refuses it.
    pub async fn create_record(&self, builder: RecordBuilder) -> LedgerResult<Record> {
        let scaffolded = if builder.has_body() {
            builder
        } else {
            let body = self.templates.render_body(&builder)?;
            builder.with_body(body)
        };
        let record = scaffolded.build(&**self.store.clock())?;
        Ok(self.store.create(record).await?)
    }

    /// Starts the timeout watcher at the configured interval.
    #[must_use = "dropping the handle detaches the watcher"]
    pub fn spawn_timeout_watcher(&self) -> JoinHandle<()> {
        self.coordinator
            .spawn_timeout_watcher(self.config.watch_interval())
    }
}

impl<R, D> Ledger<R, D, ManualClock>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
{
    /// Starts a timeout watcher driven by the ledger's manual clock: every
    /// move of the clock expires whatever fell overdue.
    #[must_use = "dropping the handle detaches the watcher"]
    pub fn spawn_clock_watcher(&self) -> JoinHandle<()> {
        self.coordinator
            .spawn_clock_watcher(self.store.clock().subscribe())
    }
}
