//! Validation gate contract.

use crate::lifecycle::domain::GateReport;
use crate::record::domain::{Record, RecordStatus};

/// Pluggable check run before a record moves to `Review` or `Done`.
///
/// Gates see the record as it is before the transition and the proposed
/// status. They must be side-effect free and safe to call concurrently.
pub trait ValidationGate: Send + Sync {
    /// Stable gate name used in findings and logs.
    fn name(&self) -> &'static str;

    /// Evaluates `record` for a move to `target`.
    fn evaluate(&self, record: &Record, target: RecordStatus) -> GateReport;
}
