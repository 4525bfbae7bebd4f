//! Shared helpers for ledger integration tests.

use camino::Utf8PathBuf;
use chrono::{TimeZone, Utc};
use eyre::eyre;
use rstest::fixture;
use tempfile::TempDir;
use workledger::clock::ManualClock;
use workledger::record::domain::{ActorId, Record, RecordBuilder, RecordId, RecordKind};
use workledger::store::adapters::{FileSystemRecordRepository, KindDirectoryStrategy};

/// Fixed starting instant for manual clocks.
pub const START_SECS: i64 = 1_790_000_000;

/// Provides a clock frozen at [`START_SECS`].
#[fixture]
pub fn clock() -> ManualClock {
    ManualClock::new(
        Utc.timestamp_opt(START_SECS, 0)
            .single()
            .unwrap_or(chrono::DateTime::UNIX_EPOCH),
    )
}

/// A temporary ledger root removed when the guard drops.
pub struct TempRoot {
    _guard: TempDir,
    /// UTF-8 path of the root.
    pub path: Utf8PathBuf,
}

/// Creates an empty temporary ledger root.
///
/// # Errors
///
/// Returns an error when the directory cannot be created or its path is not
/// UTF-8.
pub fn temp_root() -> eyre::Result<TempRoot> {
    let guard = tempfile::tempdir()?;
    let path = Utf8PathBuf::from_path_buf(guard.path().to_path_buf())
        .map_err(|path| eyre!("temporary directory {} is not UTF-8", path.display()))?;
    Ok(TempRoot {
        _guard: guard,
        path,
    })
}

/// Opens a filesystem repository with the default layout.
///
/// # Errors
///
/// Returns an error when the root cannot be indexed.
pub async fn open_filesystem(root: &TempRoot) -> eyre::Result<FileSystemRecordRepository> {
    Ok(FileSystemRecordRepository::open(root.path.clone(), KindDirectoryStrategy::new()).await?)
}

/// Parses a record identifier.
///
/// # Errors
///
/// Returns an error for an invalid identifier.
pub fn id(value: &str) -> eyre::Result<RecordId> {
    Ok(RecordId::new(value)?)
}

/// Parses an actor identifier.
///
/// # Errors
///
/// Returns an error for an invalid identifier.
pub fn actor(value: &str) -> eyre::Result<ActorId> {
    Ok(ActorId::new(value)?)
}

/// Starts a task builder with a small body.
///
/// # Errors
///
/// Returns an error for an invalid identifier.
pub fn task(value: &str, title: &str) -> eyre::Result<RecordBuilder> {
    Ok(Record::builder(id(value)?, title, RecordKind::Task).with_body("## Description\n"))
}
