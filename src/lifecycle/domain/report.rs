//! Validation gate reports.

use std::fmt;

/// Overall verdict of one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateVerdict {
    /// Nothing to object to.
    Pass,
    /// A human should look before the transition proceeds.
    NeedsReview,
    /// The transition must not proceed.
    Fail,
}

impl GateVerdict {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::NeedsReview => "needs_review",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured observation made by a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Name of the gate that made the finding.
    pub gate: String,
    /// Stable machine-readable code, for example `missing-section`.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// The part of the record concerned, when there is one.
    pub subject: Option<String>,
}

impl Finding {
    /// Creates a finding without a subject.
    #[must_use]
    pub fn new(gate: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            code: code.into(),
            message: message.into(),
            subject: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.gate, self.code, self.message)?;
        if let Some(subject) = &self.subject {
            write!(f, " ({subject})")?;
        }
        Ok(())
    }
}

/// Result of running one gate against a proposed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    /// Name of the gate.
    pub gate: String,
    /// Overall verdict.
    pub verdict: GateVerdict,
    /// Observations backing the verdict.
    pub findings: Vec<Finding>,
}

impl GateReport {
    /// A passing report.
    #[must_use]
    pub fn pass(gate: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            verdict: GateVerdict::Pass,
            findings: Vec::new(),
        }
    }

    /// A failing report.
    #[must_use]
    pub fn fail(gate: impl Into<String>, findings: Vec<Finding>) -> Self {
        Self {
            gate: gate.into(),
            verdict: GateVerdict::Fail,
            findings,
        }
    }

    /// A report asking for review.
    #[must_use]
    pub fn needs_review(gate: impl Into<String>, findings: Vec<Finding>) -> Self {
        Self {
            gate: gate.into(),
            verdict: GateVerdict::NeedsReview,
            findings,
        }
    }

    /// Builds a report whose verdict is `verdict` when `findings` is
    /// non-empty and [`GateVerdict::Pass`] otherwise.
    #[must_use]
    pub fn from_findings(gate: impl Into<String>, verdict: GateVerdict, findings: Vec<Finding>) -> Self {
        let effective = if findings.is_empty() {
            GateVerdict::Pass
        } else {
            verdict
        };
        Self {
            gate: gate.into(),
            verdict: effective,
            findings,
        }
    }
}
