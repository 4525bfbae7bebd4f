//! Gate requiring an assignee before review.

use crate::lifecycle::domain::{Finding, GateReport};
use crate::lifecycle::ports::ValidationGate;
use crate::record::domain::{Record, RecordStatus};

/// Fails a move to `Review` when nobody is assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssigneeGate;

impl AssigneeGate {
    /// Gate name used in findings.
    pub const NAME: &'static str = "assignee";
}

impl ValidationGate for AssigneeGate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, record: &Record, target: RecordStatus) -> GateReport {
        let unassigned = record
            .assigned_to()
            .is_none_or(|assignee| assignee.trim().is_empty());
        if target == RecordStatus::Review && unassigned {
            GateReport::fail(
                Self::NAME,
                vec![Finding::new(
                    Self::NAME,
                    "missing-assignee",
                    "records under review need an assignee",
                )],
            )
        } else {
            GateReport::pass(Self::NAME)
        }
    }
}
