//! Then steps for delegation BDD scenarios.

use super::world::{DelegationWorld, record_id, run_async};
use rstest_bdd_macros::then;
use workledger::delegation::domain::DelegationState;
use workledger::delegation::error::DelegationError;
use workledger::record::domain::RecordStatus;

#[then(r#"the delegation is "{state}""#)]
fn delegation_is(world: &DelegationWorld, state: String) -> Result<(), eyre::Report> {
    let expected = DelegationState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    let delegation = run_async(world.ledger.coordinator().get(world.handle()?))?;
    if delegation.state != expected {
        return Err(eyre::eyre!(
            "expected delegation {expected}, found {}",
            delegation.state
        ));
    }
    Ok(())
}

#[then(r#""{id}" has status "{status}""#)]
fn record_has_status(world: &DelegationWorld, id: String, status: String) -> Result<(), eyre::Report> {
    let expected = RecordStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let record = run_async(world.ledger.store().get(&record_id(&id)?))?;
    if record.status() != expected {
        return Err(eyre::eyre!("expected {id} to be {expected}, found {}", record.status()));
    }
    Ok(())
}

#[then("the report is refused as timed out")]
fn report_timed_out(world: &DelegationWorld) -> Result<(), eyre::Report> {
    match world.last_report.as_ref() {
        Some(Err(DelegationError::DelegationTimedOut(_))) => Ok(()),
        other => Err(eyre::eyre!("expected a timed-out report, got {other:?}")),
    }
}

#[then(r#"the events were "{expected}""#)]
fn events_were(world: &mut DelegationWorld, expected: String) -> Result<(), eyre::Report> {
    let seen = world.drain_event_names();
    let wanted: Vec<&str> = expected.split(", ").collect();
    if seen != wanted {
        return Err(eyre::eyre!("expected events {wanted:?}, saw {seen:?}"));
    }
    Ok(())
}

#[then(r#"the escalation cause is "{cause}""#)]
fn escalation_cause(world: &DelegationWorld, cause: String) -> Result<(), eyre::Report> {
    let delegation = run_async(world.ledger.coordinator().get(world.handle()?))?;
    let found = delegation
        .escalation
        .as_ref()
        .map(|escalation| escalation.cause.as_str());
    if found != Some(cause.as_str()) {
        return Err(eyre::eyre!("expected cause {cause}, found {found:?}"));
    }
    Ok(())
}
