//! Lifecycle domain model.

mod decision;
mod report;

pub use decision::{DecisionInputs, RejectionReason, TransitionDecision, decide};
pub use report::{Finding, GateReport, GateVerdict};
