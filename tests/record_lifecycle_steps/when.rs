//! When steps for record lifecycle BDD scenarios.

use super::world::{LifecycleWorld, record_id, run_async, status};
use rstest_bdd_macros::when;
use workledger::lifecycle::services::TransitionRequest;
use workledger::record::domain::RecordStatus;

#[when(r#""{id}" is moved to "{target}""#)]
fn move_record(world: &mut LifecycleWorld, id: String, target: String) -> Result<(), eyre::Report> {
    let request = TransitionRequest::new(record_id(&id)?, status(&target)?, world.actor.clone());
    world.last_transition = Some(run_async(world.ledger.engine().transition(request)));
    Ok(())
}

#[when(r#""{id}" is un-archived"#)]
fn unarchive(world: &mut LifecycleWorld, id: String) -> Result<(), eyre::Report> {
    let request = TransitionRequest::new(record_id(&id)?, RecordStatus::ToDo, world.actor.clone())
        .with_unarchive_override();
    world.last_transition = Some(run_async(world.ledger.engine().transition(request)));
    Ok(())
}
