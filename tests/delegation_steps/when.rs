//! When steps for delegation BDD scenarios.

use super::world::{DelegationWorld, record_id, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use workledger::delegation::domain::{Confidence, Outcome};
use workledger::lifecycle::services::TransitionRequest;
use workledger::record::domain::RecordStatus;

#[when("the delegate reports completion with confidence {confidence:f64}")]
fn report_completion(world: &mut DelegationWorld, confidence: f64) -> Result<(), eyre::Report> {
    let handle = world.handle()?;
    let rated = Confidence::new(confidence)?;
    world.last_report = Some(run_async(world.ledger.coordinator().report(
        handle,
        Outcome::completed("done"),
        Some(rated),
    )));
    Ok(())
}

#[when("overdue delegations are expired")]
fn expire_overdue(world: &mut DelegationWorld) -> Result<(), eyre::Report> {
    let expired = run_async(world.ledger.coordinator().expire_overdue())
        .wrap_err("expire overdue delegations")?;
    if expired.is_empty() {
        return Err(eyre::eyre!("nothing was overdue"));
    }
    Ok(())
}

#[when("the coordinator escalates the delegation")]
fn escalate(world: &mut DelegationWorld) -> Result<(), eyre::Report> {
    let handle = world.handle()?;
    run_async(world.ledger.coordinator().escalate(handle, "needs a new owner"))
        .wrap_err("escalate delegation")?;
    Ok(())
}

#[when(r#""{id}" is archived"#)]
fn archive(world: &mut DelegationWorld, id: String) -> Result<(), eyre::Report> {
    let request = TransitionRequest::new(
        record_id(&id)?,
        RecordStatus::Archived,
        world.ledger.coordinator().coordinator().clone(),
    );
    run_async(world.ledger.engine().transition(request)).wrap_err("archive record")?;
    Ok(())
}
