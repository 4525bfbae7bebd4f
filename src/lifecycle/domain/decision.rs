//! Pure transition decisions.

use super::{Finding, GateReport, GateVerdict};
use crate::record::domain::{Record, RecordId, RecordStatus};
use std::fmt;

/// Why a transition is structurally impossible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The target is not a legal successor of the current status.
    IllegalSuccessor,
    /// Leaving `Archived` needs the explicit un-archive override.
    UnarchiveNotPermitted,
    /// Dependencies that must be done are not.
    UnsatisfiedDependencies(Vec<RecordId>),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalSuccessor => f.write_str("not a legal successor"),
            Self::UnarchiveNotPermitted => {
                f.write_str("un-archiving requires an explicit override")
            }
            Self::UnsatisfiedDependencies(ids) => {
                let rendered: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
                write!(f, "unsatisfied dependencies: {}", rendered.join(", "))
            }
        }
    }
}

/// Outcome of evaluating a proposed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    /// The transition may be applied.
    Allowed,
    /// The transition is structurally impossible.
    Rejected(RejectionReason),
    /// A gate failed.
    Vetoed(Vec<Finding>),
    /// A gate asks for review before the transition proceeds.
    NeedsReview(Vec<Finding>),
}

impl TransitionDecision {
    /// Returns `true` for [`TransitionDecision::Allowed`].
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Folds gate reports into a decision: any failure vetoes, otherwise any
    /// review request asks for review.
    #[must_use]
    pub fn from_reports(reports: Vec<GateReport>) -> Self {
        let mut failures = Vec::new();
        let mut reviews = Vec::new();
        for report in reports {
            match report.verdict {
                GateVerdict::Fail => failures.extend(report.findings),
                GateVerdict::NeedsReview => reviews.extend(report.findings),
                GateVerdict::Pass => {}
            }
        }
        if !failures.is_empty() {
            Self::Vetoed(failures)
        } else if !reviews.is_empty() {
            Self::NeedsReview(reviews)
        } else {
            Self::Allowed
        }
    }
}

impl fmt::Display for TransitionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => f.write_str("allowed"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::Vetoed(findings) => write!(f, "vetoed by {} finding(s)", findings.len()),
            Self::NeedsReview(findings) => {
                write!(f, "needs review: {} finding(s)", findings.len())
            }
        }
    }
}

/// Facts about the world a decision depends on, gathered by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionInputs {
    /// Whether the caller asked to leave `Archived`.
    pub allow_unarchive: bool,
    /// Whether starting work also requires satisfied dependencies.
    pub require_dependencies_to_start: bool,
    /// Dependencies of the record that are not done, including missing ones.
    pub unsatisfied_dependencies: Vec<RecordId>,
}

/// Decides whether `record` may move to `target`.
///
/// Structural rules are checked first; `evaluate_gates` only runs when they
/// pass, and only for transitions toward `Review` or `Done`.
#[must_use]
pub fn decide<F>(
    record: &Record,
    target: RecordStatus,
    inputs: &DecisionInputs,
    evaluate_gates: F,
) -> TransitionDecision
where
    F: FnOnce() -> Vec<GateReport>,
{
    let from = record.status();
    if from.is_unarchive(target) {
        if !inputs.allow_unarchive {
            return TransitionDecision::Rejected(RejectionReason::UnarchiveNotPermitted);
        }
    } else if !from.can_transition_to(target) {
        return TransitionDecision::Rejected(RejectionReason::IllegalSuccessor);
    }

    let needs_dependencies = target == RecordStatus::Done
        || (inputs.require_dependencies_to_start
            && from == RecordStatus::ToDo
            && target == RecordStatus::InProgress);
    if needs_dependencies && !inputs.unsatisfied_dependencies.is_empty() {
        return TransitionDecision::Rejected(RejectionReason::UnsatisfiedDependencies(
            inputs.unsatisfied_dependencies.clone(),
        ));
    }

    if matches!(target, RecordStatus::Review | RecordStatus::Done) {
        TransitionDecision::from_reports(evaluate_gates())
    } else {
        TransitionDecision::Allowed
    }
}
