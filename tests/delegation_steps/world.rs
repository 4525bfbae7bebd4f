//! Shared world state for delegation BDD scenarios.

use rstest::fixture;
use workledger::clock::ManualClock;
use workledger::config::LedgerConfig;
use workledger::delegation::domain::{DelegationEvent, DelegationHandle};
use workledger::delegation::error::DelegationResult;
use workledger::delegation::services::{DelegationEvents, ReportReceipt};
use workledger::ledger::MemoryLedger;
use workledger::record::domain::{ActorId, RecordId};

/// Ledger type used by the BDD world.
pub type TestLedger = MemoryLedger<ManualClock>;

/// Scenario world for delegation behaviour tests.
pub struct DelegationWorld {
    pub clock: ManualClock,
    pub ledger: TestLedger,
    pub events: DelegationEvents,
    pub handle: Option<DelegationHandle>,
    pub last_report: Option<DelegationResult<ReportReceipt>>,
}

impl DelegationWorld {
    /// Creates a world over an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        let clock = ManualClock::default();
        let mut ledger = TestLedger::in_memory(LedgerConfig::default(), clock.clone())
            .expect("default configuration assembles a ledger");
        let events = ledger.take_events().expect("fresh ledger has its receiver");
        Self {
            clock,
            ledger,
            events,
            handle: None,
            last_report: None,
        }
    }

    /// Returns the handle of the scenario's delegation.
    pub fn handle(&self) -> Result<DelegationHandle, eyre::Report> {
        self.handle
            .ok_or_else(|| eyre::eyre!("missing delegation in scenario world"))
    }

    /// Drains the event channel into names such as `timed_out`.
    pub fn drain_event_names(&mut self) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            names.push(event_name(&event));
        }
        names
    }
}

impl Default for DelegationWorld {
    fn default() -> Self {
        Self::new()
    }
}

const fn event_name(event: &DelegationEvent) -> &'static str {
    match event {
        DelegationEvent::Delegated { .. } => "delegated",
        DelegationEvent::Accepted { .. } => "accepted",
        DelegationEvent::Started { .. } => "started",
        DelegationEvent::Completed { .. } => "completed",
        DelegationEvent::Failed { .. } => "failed",
        DelegationEvent::TimedOut { .. } => "timed_out",
        DelegationEvent::Escalated { .. } => "escalated",
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DelegationWorld {
    DelegationWorld::default()
}

/// Parses a record identifier from step text.
pub fn record_id(raw: &str) -> Result<RecordId, eyre::Report> {
    RecordId::new(raw).map_err(|err| eyre::eyre!("invalid record id in scenario: {err}"))
}

/// Parses an actor identifier from step text.
pub fn actor_id(raw: &str) -> Result<ActorId, eyre::Report> {
    ActorId::new(raw).map_err(|err| eyre::eyre!("invalid actor in scenario: {err}"))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
