//! Persistence behaviour every record repository must share.

use super::helpers::{clock, id, open_filesystem, task, temp_root};
use eyre::ensure;
use rstest::rstest;
use std::sync::Arc;
use workledger::clock::ManualClock;
use workledger::record::domain::Priority;
use workledger::store::adapters::InMemoryRecordRepository;
use workledger::store::ports::{RecordRepository, RecordRepositoryError};
use workledger::store::services::{RecordStoreError, TaskStore};

async fn exercise_contract<R>(repository: Arc<R>, clock: ManualClock) -> eyre::Result<()>
where
    R: RecordRepository + 'static,
{
    let store = TaskStore::new(Arc::clone(&repository), Arc::new(clock.clone()));

    let base = store.create(task("T1", "Base")?.build(&clock)?).await?;
    ensure!(base.revision() == 1, "first write carries revision 1");

    let duplicate = store.create(task("T1", "Again")?.build(&clock)?).await;
    ensure!(
        matches!(
            duplicate,
            Err(RecordStoreError::Repository(RecordRepositoryError::DuplicateId(_)))
        ),
        "duplicate id accepted: {duplicate:?}"
    );

    store
        .create(task("T2", "Follower")?.with_dependency(id("T1")?).build(&clock)?)
        .await?;
    store.create(task("A0", "Sorts first")?.build(&clock)?).await?;

    let listed: Vec<String> = store
        .list()
        .await?
        .iter()
        .map(|record| record.id().to_string())
        .collect();
    ensure!(listed == ["A0", "T1", "T2"], "unexpected order {listed:?}");

    let edited = store
        .update(&id("T1")?, |record| record.with_priority(Priority::High))
        .await?;
    ensure!(edited.revision() == 2, "update advances the revision");

    let stale = repository.replace(&base, base.revision()).await;
    ensure!(
        matches!(
            stale,
            Err(RecordRepositoryError::ConcurrentModification { expected: 1, actual: 2, .. })
        ),
        "stale replace accepted: {stale:?}"
    );

    let fetched = repository
        .find_by_id(&id("T1")?)
        .await?
        .ok_or_else(|| eyre::eyre!("T1 vanished"))?;
    ensure!(fetched == edited, "stored record differs from the committed one");
    ensure!(
        repository.find_by_id(&id("NOPE")?).await?.is_none(),
        "unknown id found"
    );

    let dependents = store.dependents(&id("T1")?).await?;
    ensure!(dependents.len() == 1, "T2 depends on T1");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn in_memory_repository_honours_the_contract(clock: ManualClock) -> eyre::Result<()> {
    exercise_contract(Arc::new(InMemoryRecordRepository::new()), clock).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn filesystem_repository_honours_the_contract(clock: ManualClock) -> eyre::Result<()> {
    let root = temp_root()?;
    exercise_contract(Arc::new(open_filesystem(&root).await?), clock).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn filesystem_records_survive_reopening(clock: ManualClock) -> eyre::Result<()> {
    let root = temp_root()?;
    let written = {
        let store = TaskStore::new(Arc::new(open_filesystem(&root).await?), Arc::new(clock.clone()));
        store
            .create(task("T1", "Persisted")?.with_tags(["durable".to_owned()]).build(&clock)?)
            .await?
    };

    let reopened = open_filesystem(&root).await?;
    let path = reopened.document_path(&id("T1")?)?;
    ensure!(
        path.as_ref().map(|found| found.as_str()) == Some("tasks/T1.md"),
        "unexpected document path {path:?}"
    );
    let loaded = reopened.find_by_id(&id("T1")?).await?;
    ensure!(loaded.as_ref() == Some(&written), "reloaded record differs");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn undecodable_documents_are_skipped_and_listed() -> eyre::Result<()> {
    let root = temp_root()?;
    std::fs::create_dir_all(root.path.join("tasks"))?;
    std::fs::write(root.path.join("tasks").join("broken.md"), "no metadata here\n")?;

    let repository = open_filesystem(&root).await?;

    ensure!(repository.list().await?.is_empty(), "broken file was indexed");
    let unreadable = repository.unreadable_documents();
    ensure!(unreadable.len() == 1, "expected one unreadable document");
    ensure!(
        unreadable
            .iter()
            .all(|document| document.path.as_str() == "tasks/broken.md"),
        "unexpected unreadable path"
    );
    Ok(())
}
