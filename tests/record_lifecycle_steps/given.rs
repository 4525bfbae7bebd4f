//! Given steps for record lifecycle BDD scenarios.

use super::world::{LifecycleWorld, record_id, run_async, status};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use workledger::lifecycle::services::{TransitionOutcome, TransitionRequest};
use workledger::record::domain::{Record, RecordKind};

#[given(r#"a task "{id}" titled "{title}""#)]
fn a_task(world: &mut LifecycleWorld, id: String, title: String) -> Result<(), eyre::Report> {
    let builder = Record::builder(record_id(&id)?, title, RecordKind::Task);
    run_async(world.ledger.create_record(builder)).wrap_err("create task for scenario")?;
    Ok(())
}

#[given(r#""{id}" depends on "{dependency}""#)]
fn depends_on(
    world: &mut LifecycleWorld,
    id: String,
    dependency: String,
) -> Result<(), eyre::Report> {
    let target = record_id(&dependency)?;
    run_async(
        world
            .ledger
            .store()
            .update(&record_id(&id)?, move |record| record.with_dependency(target)),
    )
    .wrap_err("add dependency in scenario setup")?;
    Ok(())
}

#[given(r#""{id}" has moved to "{target}""#)]
fn has_moved(world: &mut LifecycleWorld, id: String, target: String) -> Result<(), eyre::Report> {
    let request = TransitionRequest::new(record_id(&id)?, status(&target)?, world.actor.clone());
    let outcome = run_async(world.ledger.engine().transition(request))
        .wrap_err("transition record in scenario setup")?;
    if let TransitionOutcome::AwaitingReview { findings, .. } = outcome {
        return Err(eyre::eyre!("setup transition stopped for review: {findings:?}"));
    }
    Ok(())
}
