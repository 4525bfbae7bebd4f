//! Gate requiring named body sections.

use super::headings;
use crate::lifecycle::domain::{Finding, GateReport, GateVerdict};
use crate::lifecycle::ports::ValidationGate;
use crate::record::domain::{Record, RecordStatus};

/// Fails when the body lacks any of the configured section headings.
///
/// Headings match case-insensitively at any level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredSectionsGate {
    sections: Vec<String>,
}

impl RequiredSectionsGate {
    /// Gate name used in findings.
    pub const NAME: &'static str = "required-sections";

    /// Creates a gate requiring `sections`.
    #[must_use]
    pub fn new(sections: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            sections: sections.into_iter().map(Into::into).collect(),
        }
    }
}

impl ValidationGate for RequiredSectionsGate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, record: &Record, _target: RecordStatus) -> GateReport {
        let present: Vec<String> = headings(record.body()).map(str::to_lowercase).collect();
        let findings = self
            .sections
            .iter()
            .filter(|section| !present.contains(&section.trim().to_lowercase()))
            .map(|section| {
                Finding::new(
                    Self::NAME,
                    "missing-section",
                    format!("body has no '{section}' section"),
                )
                .with_subject(section.clone())
            })
            .collect();
        GateReport::from_findings(Self::NAME, GateVerdict::Fail, findings)
    }
}
