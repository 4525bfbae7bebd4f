//! Then steps for record lifecycle BDD scenarios.

use super::world::{LifecycleWorld, record_id, run_async, status};
use rstest_bdd_macros::then;
use workledger::lifecycle::domain::RejectionReason;
use workledger::lifecycle::services::{LifecycleError, TransitionOutcome};

fn refusal(world: &LifecycleWorld) -> Result<&RejectionReason, eyre::Report> {
    match world.last_transition.as_ref() {
        Some(Err(LifecycleError::IllegalTransition { reason, .. })) => Ok(reason),
        other => Err(eyre::eyre!("expected an illegal transition, got {other:?}")),
    }
}

#[then("the transition succeeds")]
fn transition_succeeds(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match world.last_transition.as_ref() {
        Some(Ok(TransitionOutcome::Applied(_))) => Ok(()),
        other => Err(eyre::eyre!("expected an applied transition, got {other:?}")),
    }
}

#[then("the transition is refused for unsatisfied dependencies")]
fn refused_for_dependencies(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match refusal(world)? {
        RejectionReason::UnsatisfiedDependencies(blocking) if !blocking.is_empty() => Ok(()),
        other => Err(eyre::eyre!("expected unsatisfied dependencies, got {other:?}")),
    }
}

#[then("the transition is refused as an illegal successor")]
fn refused_as_illegal(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match refusal(world)? {
        RejectionReason::IllegalSuccessor => Ok(()),
        other => Err(eyre::eyre!("expected an illegal successor, got {other:?}")),
    }
}

#[then("the transition is refused as an un-archive")]
fn refused_as_unarchive(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match refusal(world)? {
        RejectionReason::UnarchiveNotPermitted => Ok(()),
        other => Err(eyre::eyre!("expected a refused un-archive, got {other:?}")),
    }
}

#[then(r#""{id}" has status "{expected}""#)]
fn has_status(world: &LifecycleWorld, id: String, expected: String) -> Result<(), eyre::Report> {
    let expected_status = status(&expected)?;
    let record = run_async(world.ledger.store().get(&record_id(&id)?))?;
    if record.status() != expected_status {
        return Err(eyre::eyre!(
            "expected {id} to be {expected_status}, found {}",
            record.status()
        ));
    }
    Ok(())
}
