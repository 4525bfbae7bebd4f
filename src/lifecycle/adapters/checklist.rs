//! Gate holding back completion while checklist items are open.

use crate::lifecycle::domain::{Finding, GateReport, GateVerdict};
use crate::lifecycle::ports::ValidationGate;
use crate::record::domain::{LOG_HEADING, Record, RecordStatus};

/// Asks for review when a record moving to `Done` still has unchecked
/// Markdown checkboxes (`- [ ]`). Other targets pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecklistGate;

impl ChecklistGate {
    /// Gate name used in findings.
    pub const NAME: &'static str = "checklist";
}

fn unchecked_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    ["- [ ]", "* [ ]", "+ [ ]"]
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .map(str::trim)
}

impl ValidationGate for ChecklistGate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, record: &Record, target: RecordStatus) -> GateReport {
        if target != RecordStatus::Done {
            return GateReport::pass(Self::NAME);
        }
        let findings = record
            .body()
            .lines()
            .take_while(|line| line.trim_end() != LOG_HEADING)
            .filter_map(unchecked_item)
            .map(|item| {
                let subject = if item.is_empty() { "(empty item)" } else { item };
                Finding::new(Self::NAME, "unchecked-item", "checklist item is not ticked")
                    .with_subject(subject)
            })
            .collect();
        GateReport::from_findings(Self::NAME, GateVerdict::NeedsReview, findings)
    }
}
