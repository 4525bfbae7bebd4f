//! Registry of validation gates by record kind.

use crate::lifecycle::domain::GateReport;
use crate::lifecycle::ports::ValidationGate;
use crate::record::domain::{Record, RecordKind, RecordStatus};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Which records a gate applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateScope {
    /// Every record.
    AllKinds,
    /// Records of one kind.
    Kind(RecordKind),
}

/// Gates grouped by the kinds they apply to.
#[derive(Clone, Default)]
pub struct GateRegistry {
    universal: Vec<Arc<dyn ValidationGate>>,
    by_kind: BTreeMap<RecordKind, Vec<Arc<dyn ValidationGate>>>,
}

impl fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |gates: &[Arc<dyn ValidationGate>]| -> Vec<&'static str> {
            gates.iter().map(|gate| gate.name()).collect()
        };
        let by_kind: BTreeMap<&str, Vec<&'static str>> = self
            .by_kind
            .iter()
            .map(|(kind, gates)| (kind.as_str(), names(gates)))
            .collect();
        f.debug_struct("GateRegistry")
            .field("universal", &names(&self.universal))
            .field("by_kind", &by_kind)
            .finish()
    }
}

impl GateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a gate for `scope`.
    #[must_use]
    pub fn with_gate(mut self, scope: GateScope, gate: Arc<dyn ValidationGate>) -> Self {
        self.register(scope, gate);
        self
    }

    /// Adds a gate for `scope`.
    pub fn register(&mut self, scope: GateScope, gate: Arc<dyn ValidationGate>) {
        match scope {
            GateScope::AllKinds => self.universal.push(gate),
            GateScope::Kind(kind) => self.by_kind.entry(kind).or_default().push(gate),
        }
    }

    /// Returns `true` when no gate is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.universal.is_empty() && self.by_kind.is_empty()
    }

    /// Runs every gate applying to `record`, universal gates first.
    #[must_use]
    pub fn evaluate(&self, record: &Record, target: RecordStatus) -> Vec<GateReport> {
        self.universal
            .iter()
            .chain(self.by_kind.get(record.kind()).into_iter().flatten())
            .map(|gate| gate.evaluate(record, target))
            .collect()
    }
}
