//! End-to-end flows through an assembled ledger.

use super::helpers::{actor, clock, id, task, temp_root};
use chrono::TimeDelta;
use eyre::{ensure, eyre};
use rstest::rstest;
use std::time::Duration;
use workledger::clock::ManualClock;
use workledger::config::LedgerConfig;
use workledger::delegation::domain::{DelegationEvent, DelegationState, Outcome};
use workledger::delegation::error::DelegationError;
use workledger::delegation::services::{Advancement, DelegateRequest};
use workledger::ledger::{FileLedger, MemoryLedger};
use workledger::lifecycle::domain::RejectionReason;
use workledger::lifecycle::services::{LifecycleError, TransitionOutcome, TransitionRequest};
use workledger::record::domain::{RecordId, RecordStatus};

type TestLedger = MemoryLedger<ManualClock>;

async fn walk(ledger: &TestLedger, record: &str, path: &[RecordStatus]) -> eyre::Result<()> {
    for step in path {
        let request = TransitionRequest::new(id(record)?, *step, actor("alice")?);
        match ledger.engine().transition(request).await? {
            TransitionOutcome::Applied(_) => {}
            TransitionOutcome::AwaitingReview { findings, .. } => {
                return Err(eyre!("{record} stopped for review: {findings:?}"));
            }
        }
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn done_waits_for_dependencies(clock: ManualClock) -> eyre::Result<()> {
    let ledger = TestLedger::in_memory(LedgerConfig::default(), clock.clone())?;
    ledger.create_record(task("T1", "Foundation")?).await?;
    ledger
        .create_record(task("T2", "Walls")?.with_dependency(id("T1")?))
        .await?;
    walk(&ledger, "T2", &[RecordStatus::InProgress, RecordStatus::Review]).await?;

    let premature = ledger
        .engine()
        .transition(TransitionRequest::new(id("T2")?, RecordStatus::Done, actor("alice")?))
        .await;
    let Err(LifecycleError::IllegalTransition {
        reason: RejectionReason::UnsatisfiedDependencies(blocking),
        ..
    }) = premature
    else {
        return Err(eyre!("expected unsatisfied dependencies, got {premature:?}"));
    };
    ensure!(blocking == [id("T1")?], "T1 should block T2");
    ensure!(
        ledger.store().get(&id("T2")?).await?.status() == RecordStatus::Review,
        "a refused transition leaves the record alone"
    );

    walk(
        &ledger,
        "T1",
        &[RecordStatus::InProgress, RecordStatus::Review, RecordStatus::Done],
    )
    .await?;
    walk(&ledger, "T2", &[RecordStatus::Done]).await?;

    let finished = ledger.store().get(&id("T2")?).await?;
    ensure!(finished.status() == RecordStatus::Done);
    ensure!(
        finished.body().contains("alice"),
        "transitions are logged with their actor"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn configured_gates_guard_review(clock: ManualClock) -> eyre::Result<()> {
    let config = LedgerConfig::from_toml(
        r#"
[gates.task]
required_sections = ["Risks"]
"#,
    )?;
    let ledger = TestLedger::in_memory(config, clock)?;
    ledger.create_record(task("T1", "Ungated body")?).await?;
    walk(&ledger, "T1", &[RecordStatus::InProgress]).await?;

    let blocked = ledger
        .engine()
        .transition(TransitionRequest::new(id("T1")?, RecordStatus::Review, actor("alice")?))
        .await;
    let Err(LifecycleError::ValidationBlocked { findings, .. }) = blocked else {
        return Err(eyre!("expected a validation block, got {blocked:?}"));
    };
    ensure!(findings.iter().any(|finding| finding.code == "missing-section"));

    ledger
        .store()
        .update(&id("T1")?, |record| {
            let body = format!("{}\n## Risks\n\nNone.\n", record.body());
            record.with_body(body)
        })
        .await?;
    walk(&ledger, "T1", &[RecordStatus::Review]).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn late_outcome_times_out_and_escalates(clock: ManualClock) -> eyre::Result<()> {
    let mut ledger = TestLedger::in_memory(LedgerConfig::default(), clock.clone())?;
    let mut events = ledger
        .take_events()
        .ok_or_else(|| eyre!("event receiver already taken"))?;
    ledger.create_record(task("T1", "Slow work")?).await?;

    let delegation = ledger
        .coordinator()
        .delegate(DelegateRequest::new(
            id("T1")?,
            actor("worker")?,
            TimeDelta::seconds(5),
        ))
        .await?;
    ledger.coordinator().accept(delegation.handle).await?;

    clock.advance(TimeDelta::seconds(5));
    let late = ledger
        .coordinator()
        .report(delegation.handle, Outcome::completed("finally"), None)
        .await;
    ensure!(
        matches!(late, Err(DelegationError::DelegationTimedOut(handle)) if handle == delegation.handle),
        "expected a timeout, got {late:?}"
    );
    ensure!(
        ledger.coordinator().get(delegation.handle).await?.state == DelegationState::TimedOut
    );

    let escalated = ledger
        .coordinator()
        .escalate(delegation.handle, "worker unresponsive")
        .await?;
    ensure!(escalated.state == DelegationState::Escalated);
    ensure!(
        ledger.store().get(&id("T1")?).await?.status() == RecordStatus::ToDo,
        "a timed-out delegation never advances the record"
    );

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    ensure!(
        matches!(
            seen.as_slice(),
            [
                DelegationEvent::Delegated { .. },
                DelegationEvent::Accepted { .. },
                DelegationEvent::TimedOut { .. },
                DelegationEvent::Escalated { .. },
            ]
        ),
        "unexpected events {seen:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unanswered_delegation_times_out_on_simulated_time(clock: ManualClock) -> eyre::Result<()> {
    let ledger = TestLedger::in_memory(LedgerConfig::default(), clock.clone())?;
    ledger.create_record(task("T1", "Quiet work")?).await?;
    let delegation = ledger
        .coordinator()
        .delegate(DelegateRequest::new(
            id("T1")?,
            actor("agent-x")?,
            TimeDelta::seconds(5),
        ))
        .await?;

    clock.advance(TimeDelta::seconds(6));

    let stored = ledger.coordinator().get(delegation.handle).await?;
    ensure!(
        stored.state == DelegationState::TimedOut,
        "expected timed_out, got {}",
        stored.state
    );
    ensure!(ledger.store().get(&id("T1")?).await?.status() == RecordStatus::ToDo);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn watcher_expires_silent_delegations(clock: ManualClock) -> eyre::Result<()> {
    let mut ledger = TestLedger::in_memory(LedgerConfig::default(), clock.clone())?;
    let mut events = ledger
        .take_events()
        .ok_or_else(|| eyre!("event receiver already taken"))?;
    ledger.create_record(task("T1", "Silent work")?).await?;
    let delegation = ledger
        .coordinator()
        .delegate(DelegateRequest::new(
            id("T1")?,
            actor("worker")?,
            TimeDelta::seconds(30),
        ))
        .await?;

    let watcher = ledger.spawn_clock_watcher();
    clock.advance(TimeDelta::seconds(31));

    let expired = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = events.recv().await {
            if matches!(event, DelegationEvent::TimedOut { .. }) {
                return Some(event.handle());
            }
        }
        None
    })
    .await?;
    watcher.abort();

    ensure!(expired == Some(delegation.handle), "watcher did not expire the delegation");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn file_ledger_survives_reopening() -> eyre::Result<()> {
    let root = temp_root()?;
    let handle = {
        let ledger = FileLedger::open(LedgerConfig::for_root(root.path.clone())).await?;
        ledger.create_record(task("T1", "Durable")?).await?;
        ledger
            .coordinator()
            .delegate(
                DelegateRequest::new(id("T1")?, actor("worker")?, TimeDelta::hours(1))
                    .with_instructions(serde_json::json!({ "focus": "docs" })),
            )
            .await?
            .handle
    };

    let reopened = FileLedger::open(LedgerConfig::for_root(root.path.clone())).await?;
    let outstanding = reopened.coordinator().list_outstanding().await?;
    ensure!(
        outstanding.iter().any(|delegation| delegation.handle == handle),
        "delegation lost on reopen"
    );

    reopened.coordinator().accept(handle).await?;
    let receipt = reopened
        .coordinator()
        .report(handle, Outcome::completed("written"), None)
        .await?;
    ensure!(
        matches!(
            receipt.advancement,
            Advancement::Advanced {
                from: RecordStatus::ToDo,
                to: RecordStatus::Review
            }
        ),
        "unexpected advancement {:?}",
        receipt.advancement
    );

    let record = reopened.store().get(&RecordId::new("T1")?).await?;
    ensure!(record.status() == RecordStatus::Review);
    ensure!(record.body().contains(&handle.to_string()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn templates_scaffold_new_bodies(clock: ManualClock) -> eyre::Result<()> {
    let ledger = TestLedger::in_memory(LedgerConfig::default(), clock)?;
    let builder = workledger::record::domain::Record::builder(
        id("B1")?,
        "Crash on save",
        workledger::record::domain::RecordKind::Bug,
    );
    let created = ledger.create_record(builder).await?;
    ensure!(created.body().contains("# Crash on save"));
    ensure!(created.body().contains("## Steps to Reproduce"));
    Ok(())
}
