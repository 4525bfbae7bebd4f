//! Optimistic concurrency under real contention.

use super::helpers::{clock, id, open_filesystem, task, temp_root};
use eyre::ensure;
use rstest::rstest;
use std::sync::{Arc, Barrier};
use workledger::clock::ManualClock;
use workledger::record::domain::Priority;
use workledger::store::adapters::InMemoryRecordRepository;
use workledger::store::ports::RecordRepository;
use workledger::store::services::{RecordStoreResult, TaskStore};

/// Runs two updates that both read revision 1 before either commits.
async fn race_two_updates<R>(repository: Arc<R>, clock: ManualClock) -> eyre::Result<()>
where
    R: RecordRepository + 'static,
{
    let store = Arc::new(TaskStore::new(repository, Arc::new(clock.clone())));
    store.create(task("T1", "Contended")?.build(&clock)?).await?;

    let barrier = Arc::new(Barrier::new(2));
    let contenders = [Priority::High, Priority::Low].map(|priority| {
        let racer = Arc::clone(&store);
        let gate = Arc::clone(&barrier);
        tokio::spawn(async move {
            let target = id("T1")?;
            let outcome: RecordStoreResult<_> = racer
                .update(&target, move |record| {
                    gate.wait();
                    record.with_priority(priority)
                })
                .await;
            Ok::<_, eyre::Report>(outcome)
        })
    });

    let mut committed = 0;
    let mut conflicts = 0;
    for contender in contenders {
        match contender.await?? {
            Ok(record) => {
                committed += 1;
                ensure!(record.revision() == 2, "winner carries revision 2");
            }
            Err(err) if err.is_concurrent_modification() => conflicts += 1,
            Err(err) => return Err(err.into()),
        }
    }
    ensure!(committed == 1, "expected one winner, got {committed}");
    ensure!(conflicts == 1, "expected one conflict, got {conflicts}");

    let stored = store.get(&id("T1")?).await?;
    ensure!(stored.revision() == 2, "loser must not bump the revision");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn in_memory_store_admits_exactly_one_concurrent_writer(
    clock: ManualClock,
) -> eyre::Result<()> {
    race_two_updates(Arc::new(InMemoryRecordRepository::new()), clock).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn filesystem_store_admits_exactly_one_concurrent_writer(
    clock: ManualClock,
) -> eyre::Result<()> {
    let root = temp_root()?;
    race_two_updates(Arc::new(open_filesystem(&root).await?), clock).await
}
