//! Given steps for delegation BDD scenarios.

use super::world::{DelegationWorld, actor_id, record_id, run_async};
use chrono::TimeDelta;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use workledger::delegation::services::DelegateRequest;
use workledger::record::domain::{Record, RecordKind};

#[given(r#"a task "{id}" titled "{title}""#)]
fn a_task(world: &mut DelegationWorld, id: String, title: String) -> Result<(), eyre::Report> {
    let builder = Record::builder(record_id(&id)?, title, RecordKind::Task);
    run_async(world.ledger.create_record(builder)).wrap_err("create task for scenario")?;
    Ok(())
}

#[given(r#""{id}" is delegated to "{delegate}" for {seconds:u64} seconds"#)]
fn delegated(
    world: &mut DelegationWorld,
    id: String,
    delegate: String,
    seconds: u64,
) -> Result<(), eyre::Report> {
    let timeout = TimeDelta::try_seconds(i64::try_from(seconds)?)
        .ok_or_else(|| eyre::eyre!("timeout out of range"))?;
    let request = DelegateRequest::new(record_id(&id)?, actor_id(&delegate)?, timeout);
    let delegation = run_async(world.ledger.coordinator().delegate(request))
        .wrap_err("delegate record in scenario setup")?;
    world.handle = Some(delegation.handle);
    Ok(())
}

#[given("the delegate accepts the work")]
fn delegate_accepts(world: &mut DelegationWorld) -> Result<(), eyre::Report> {
    let handle = world.handle()?;
    run_async(world.ledger.coordinator().accept(handle)).wrap_err("accept delegation")?;
    Ok(())
}

#[given("{seconds:u64} seconds pass")]
fn time_passes(world: &mut DelegationWorld, seconds: u64) -> Result<(), eyre::Report> {
    let elapsed = TimeDelta::try_seconds(i64::try_from(seconds)?)
        .ok_or_else(|| eyre::eyre!("duration out of range"))?;
    world.clock.advance(elapsed);
    Ok(())
}
