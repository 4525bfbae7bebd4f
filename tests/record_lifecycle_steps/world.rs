//! Shared world state for record lifecycle BDD scenarios.

use rstest::fixture;
use workledger::clock::ManualClock;
use workledger::config::LedgerConfig;
use workledger::ledger::MemoryLedger;
use workledger::lifecycle::services::{LifecycleError, TransitionOutcome};
use workledger::record::domain::{ActorId, RecordId, RecordStatus};

/// Ledger type used by the BDD world.
pub type TestLedger = MemoryLedger<ManualClock>;

/// Scenario world for record lifecycle behaviour tests.
pub struct LifecycleWorld {
    pub ledger: TestLedger,
    pub actor: ActorId,
    pub last_transition: Option<Result<TransitionOutcome, LifecycleError>>,
}

impl LifecycleWorld {
    /// Creates a world over an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        let ledger = TestLedger::in_memory(LedgerConfig::default(), ManualClock::default())
            .expect("default configuration assembles a ledger");
        Self {
            ledger,
            actor: ActorId::new("alice").expect("valid actor"),
            last_transition: None,
        }
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Parses a record identifier from step text.
pub fn record_id(raw: &str) -> Result<RecordId, eyre::Report> {
    RecordId::new(raw).map_err(|err| eyre::eyre!("invalid record id in scenario: {err}"))
}

/// Parses a status from step text.
pub fn status(raw: &str) -> Result<RecordStatus, eyre::Report> {
    RecordStatus::try_from(raw).map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
