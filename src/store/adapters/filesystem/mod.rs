//! Filesystem record repository: one Markdown document per record.
//!
//! The repository indexes the ledger root when opened. Documents are created
//! with create-new semantics and replaced through a temporary file and a
//! rename, so a reader never observes a half-written document. A document the
//! repository indexed or wrote that later fails to decode is reported as
//! [`RecordRepositoryError::Corrupted`] and left untouched on disk.

mod paths;

pub use paths::{DOCUMENT_EXTENSION, KindDirectoryStrategy, PathStrategy};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, OpenOptions};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, warn};

use crate::record::codec::{self, CodecError};
use crate::record::domain::{Record, RecordId};
use crate::store::ports::{RecordRepository, RecordRepositoryError, RecordRepositoryResult};

/// A file under the ledger root that could not be decoded when indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableDocument {
    /// Path relative to the ledger root.
    pub path: Utf8PathBuf,
    /// Decoding failure.
    pub error: CodecError,
}

/// Filesystem-backed record repository.
pub struct FileSystemRecordRepository<P = KindDirectoryStrategy>
where
    P: PathStrategy + 'static,
{
    inner: Arc<Inner<P>>,
}

impl<P> Clone for FileSystemRecordRepository<P>
where
    P: PathStrategy + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<P> {
    root: Utf8PathBuf,
    dir: Dir,
    strategy: P,
    index: RwLock<HashMap<RecordId, Utf8PathBuf>>,
    unreadable: Vec<UnreadableDocument>,
    write_lock: Mutex<()>,
}

fn io_error(err: std::io::Error) -> RecordRepositoryError {
    RecordRepositoryError::persistence(err)
}

fn poisoned(err: impl ToString) -> RecordRepositoryError {
    RecordRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

impl<P> FileSystemRecordRepository<P>
where
    P: PathStrategy + 'static,
{
    /// Opens (creating if needed) the ledger rooted at `root` and indexes
    /// every record document beneath it.
    ///
    /// Hidden entries are skipped. Files that fail to decode are not indexed
    /// and are reported through [`Self::unreadable_documents`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordRepositoryError::Persistence`] when the root cannot be
    /// created or read, and [`RecordRepositoryError::DuplicateId`] when two
    /// documents claim the same identifier.
    pub async fn open(root: impl Into<Utf8PathBuf>, strategy: P) -> RecordRepositoryResult<Self> {
        let root_path: Utf8PathBuf = root.into();
        run_blocking(move || {
            Dir::create_ambient_dir_all(&root_path, ambient_authority()).map_err(io_error)?;
            let dir = Dir::open_ambient_dir(&root_path, ambient_authority()).map_err(io_error)?;
            let mut scan = Scan::default();
            scan.visit(&dir, Utf8Path::new(""))?;
            tracing::debug!(
                root = %root_path,
                indexed = scan.index.len(),
                unreadable = scan.unreadable.len(),
                "indexed ledger root"
            );
            Ok(Self {
                inner: Arc::new(Inner {
                    root: root_path,
                    dir,
                    strategy,
                    index: RwLock::new(scan.index),
                    unreadable: scan.unreadable,
                    write_lock: Mutex::new(()),
                }),
            })
        })
        .await
    }

    /// Returns the ledger root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.inner.root
    }

    /// Returns the files skipped while indexing because they failed to decode.
    #[must_use]
    pub fn unreadable_documents(&self) -> &[UnreadableDocument] {
        &self.inner.unreadable
    }

    /// Returns the relative document path of an indexed record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordRepositoryError::Persistence`] when the index lock is
    /// poisoned.
    pub fn document_path(&self, id: &RecordId) -> RecordRepositoryResult<Option<Utf8PathBuf>> {
        let index = self.inner.index.read().map_err(poisoned)?;
        Ok(index.get(id).cloned())
    }
}

#[derive(Default)]
struct Scan {
    index: HashMap<RecordId, Utf8PathBuf>,
    unreadable: Vec<UnreadableDocument>,
}

impl Scan {
    fn visit(&mut self, dir: &Dir, prefix: &Utf8Path) -> RecordRepositoryResult<()> {
        for listed in dir.entries().map_err(io_error)? {
            let entry = listed.map_err(io_error)?;
            let name = entry.file_name().map_err(io_error)?;
            if name.starts_with('.') {
                continue;
            }
            let path = prefix.join(&name);
            let file_type = entry.file_type().map_err(io_error)?;
            if file_type.is_dir() {
                let child = entry.open_dir().map_err(io_error)?;
                self.visit(&child, &path)?;
            } else if file_type.is_file() && path.extension() == Some(DOCUMENT_EXTENSION) {
                let bytes = dir.read(&name).map_err(io_error)?;
                self.admit(path, &bytes)?;
            }
        }
        Ok(())
    }

    fn admit(&mut self, path: Utf8PathBuf, bytes: &[u8]) -> RecordRepositoryResult<()> {
        match codec::decode(bytes) {
            Ok(record) => {
                if let Some(existing) = self.index.get(record.id()) {
                    warn!(
                        id = %record.id(),
                        first = %existing,
                        second = %path,
                        "two documents claim the same record id"
                    );
                    return Err(RecordRepositoryError::DuplicateId(record.id().clone()));
                }
                self.index.insert(record.id().clone(), path);
            }
            Err(err) => {
                warn!(path = %path, error = %err, "skipping undecodable document");
                self.unreadable.push(UnreadableDocument { path, error: err });
            }
        }
        Ok(())
    }
}

impl<P> Inner<P>
where
    P: PathStrategy,
{
    fn indexed_path(&self, id: &RecordId) -> RecordRepositoryResult<Option<Utf8PathBuf>> {
        let index = self.index.read().map_err(poisoned)?;
        Ok(index.get(id).cloned())
    }

    /// Reads and decodes a document this repository owns.
    fn load(&self, path: &Utf8Path) -> RecordRepositoryResult<Option<Record>> {
        let bytes = match self.dir.read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path, "indexed document disappeared");
                return Ok(None);
            }
            Err(err) => return Err(io_error(err)),
        };
        codec::decode(&bytes).map(Some).map_err(|err| {
            error!(path = %path, error = %err, "ledger document failed to decode");
            RecordRepositoryError::Corrupted {
                location: self.root.join(path).into_string(),
                source: err,
            }
        })
    }

    fn write_new(&self, path: &Utf8Path, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            self.dir.create_dir_all(parent)?;
        }
        let mut file = self
            .dir
            .open_with(path, OpenOptions::new().write(true).create_new(true))?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }

    fn write_replacing(&self, path: &Utf8Path, contents: &str) -> std::io::Result<()> {
        let file_name = path.file_name().unwrap_or(path.as_str());
        let temp = path.with_file_name(format!(".{file_name}.tmp"));
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            self.dir.create_dir_all(parent)?;
        }
        let mut file = self.dir.open_with(
            &temp,
            OpenOptions::new().write(true).create(true).truncate(true),
        )?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        self.dir.rename(&temp, &self.dir, path)
    }

    fn insert(&self, record: &Record) -> RecordRepositoryResult<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        if self.indexed_path(record.id())?.is_some() {
            return Err(RecordRepositoryError::DuplicateId(record.id().clone()));
        }
        let path = self.strategy.relative_path(record);
        let contents = codec::encode(record).map_err(RecordRepositoryError::persistence)?;
        match self.write_new(&path, &contents) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(RecordRepositoryError::DuplicateId(record.id().clone()));
            }
            Err(err) => return Err(io_error(err)),
        }
        let mut index = self.index.write().map_err(poisoned)?;
        index.insert(record.id().clone(), path);
        Ok(())
    }

    fn replace(&self, record: &Record, expected_revision: u64) -> RecordRepositoryResult<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let not_found = || RecordRepositoryError::NotFound(record.id().clone());
        let current_path = self.indexed_path(record.id())?.ok_or_else(not_found)?;
        let stored = self.load(&current_path)?.ok_or_else(not_found)?;
        if stored.revision() != expected_revision {
            return Err(RecordRepositoryError::ConcurrentModification {
                id: record.id().clone(),
                expected: expected_revision,
                actual: stored.revision(),
            });
        }

        let target = self.strategy.relative_path(record);
        let contents = codec::encode(record).map_err(RecordRepositoryError::persistence)?;
        self.write_replacing(&target, &contents).map_err(io_error)?;
        if target != current_path {
            self.dir.remove_file(&current_path).map_err(io_error)?;
            let mut index = self.index.write().map_err(poisoned)?;
            index.insert(record.id().clone(), target);
        }
        Ok(())
    }

    fn find(&self, id: &RecordId) -> RecordRepositoryResult<Option<Record>> {
        self.indexed_path(id)?
            .map_or(Ok(None), |path| self.load(&path))
    }

    fn list(&self) -> RecordRepositoryResult<Vec<Record>> {
        let mut paths: Vec<(RecordId, Utf8PathBuf)> = {
            let index = self.index.read().map_err(poisoned)?;
            index
                .iter()
                .map(|(id, path)| (id.clone(), path.clone()))
                .collect()
        };
        paths.sort_by(|left, right| left.0.cmp(&right.0));
        let mut records = Vec::with_capacity(paths.len());
        for (_, path) in paths {
            if let Some(record) = self.load(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Runs a blocking filesystem operation off the async executor.
async fn run_blocking<F, T>(operation: F) -> RecordRepositoryResult<T>
where
    F: FnOnce() -> RecordRepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|err| RecordRepositoryError::persistence(std::io::Error::other(err.to_string())))?
}

#[async_trait]
impl<P> RecordRepository for FileSystemRecordRepository<P>
where
    P: PathStrategy + 'static,
{
    async fn insert(&self, record: &Record) -> RecordRepositoryResult<()> {
        let inner = Arc::clone(&self.inner);
        let owned = record.clone();
        run_blocking(move || inner.insert(&owned)).await
    }

    async fn replace(&self, record: &Record, expected_revision: u64) -> RecordRepositoryResult<()> {
        let inner = Arc::clone(&self.inner);
        let owned = record.clone();
        run_blocking(move || inner.replace(&owned, expected_revision)).await
    }

    async fn find_by_id(&self, id: &RecordId) -> RecordRepositoryResult<Option<Record>> {
        let inner = Arc::clone(&self.inner);
        let lookup_id = id.clone();
        run_blocking(move || inner.find(&lookup_id)).await
    }

    async fn list(&self) -> RecordRepositoryResult<Vec<Record>> {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || inner.list()).await
    }
}
