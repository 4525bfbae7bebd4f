//! Delegation repository persisting one JSON file per handle.
//!
//! Files live under [`DELEGATION_DIRECTORY`] inside the ledger root, which
//! the record repository skips as a hidden entry. Writes go through a
//! temporary file and a rename.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, OpenOptions};
use std::io::{ErrorKind, Write};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::memory::sort_oldest_first;
use crate::delegation::domain::{Delegation, DelegationHandle};
use crate::delegation::ports::{
    DelegationRepository, DelegationRepositoryError, DelegationRepositoryResult,
};
use crate::record::domain::RecordId;

/// Directory, relative to the ledger root, holding delegation files.
pub const DELEGATION_DIRECTORY: &str = ".delegations";

const FILE_EXTENSION: &str = "json";

/// JSON-file delegation repository.
#[derive(Clone)]
pub struct JsonFileDelegationRepository {
    inner: Arc<Inner>,
}

struct Inner {
    location: Utf8PathBuf,
    dir: Dir,
    write_lock: Mutex<()>,
}

fn io_error(err: std::io::Error) -> DelegationRepositoryError {
    DelegationRepositoryError::persistence(err)
}

fn poisoned(err: impl ToString) -> DelegationRepositoryError {
    DelegationRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn file_name(handle: DelegationHandle) -> String {
    format!("{handle}.{FILE_EXTENSION}")
}

impl JsonFileDelegationRepository {
    /// Opens the delegation directory under `ledger_root`, creating it if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationRepositoryError::Persistence`] when the directory
    /// cannot be created or opened.
    pub async fn open(ledger_root: impl AsRef<Utf8Path>) -> DelegationRepositoryResult<Self> {
        let location = ledger_root.as_ref().join(DELEGATION_DIRECTORY);
        run_blocking(move || {
            Dir::create_ambient_dir_all(&location, ambient_authority()).map_err(io_error)?;
            let dir = Dir::open_ambient_dir(&location, ambient_authority()).map_err(io_error)?;
            Ok(Self {
                inner: Arc::new(Inner {
                    location,
                    dir,
                    write_lock: Mutex::new(()),
                }),
            })
        })
        .await
    }

    /// Returns the directory holding delegation files.
    #[must_use]
    pub fn location(&self) -> &Utf8Path {
        &self.inner.location
    }
}

impl Inner {
    fn decode(&self, name: &str, bytes: &[u8]) -> DelegationRepositoryResult<Delegation> {
        serde_json::from_slice(bytes).map_err(|err| DelegationRepositoryError::Corrupted {
            location: self.location.join(name).into_string(),
            reason: err.to_string(),
        })
    }

    fn read(&self, handle: DelegationHandle) -> DelegationRepositoryResult<Option<Delegation>> {
        let name = file_name(handle);
        match self.dir.read(&name) {
            Ok(bytes) => self.decode(&name, &bytes).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(err)),
        }
    }

    fn write(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let name = file_name(delegation.handle);
        let temp = format!(".{name}.tmp");
        let contents =
            serde_json::to_vec_pretty(delegation).map_err(DelegationRepositoryError::persistence)?;
        let mut file = self
            .dir
            .open_with(&temp, OpenOptions::new().write(true).create(true).truncate(true))
            .map_err(io_error)?;
        file.write_all(&contents).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        self.dir.rename(&temp, &self.dir, &name).map_err(io_error)
    }

    fn insert(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        if self.dir.exists(file_name(delegation.handle)) {
            return Err(DelegationRepositoryError::Duplicate(delegation.handle));
        }
        self.write(delegation)
    }

    fn update(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        if !self.dir.exists(file_name(delegation.handle)) {
            return Err(DelegationRepositoryError::NotFound(delegation.handle));
        }
        self.write(delegation)
    }

    fn select(
        &self,
        predicate: impl Fn(&Delegation) -> bool,
    ) -> DelegationRepositoryResult<Vec<Delegation>> {
        let mut selected = Vec::new();
        for listed in self.dir.entries().map_err(io_error)? {
            let entry = listed.map_err(io_error)?;
            let name = entry.file_name().map_err(io_error)?;
            if name.starts_with('.') || Utf8Path::new(&name).extension() != Some(FILE_EXTENSION) {
                continue;
            }
            let bytes = self.dir.read(&name).map_err(io_error)?;
            match self.decode(&name, &bytes) {
                Ok(delegation) if predicate(&delegation) => selected.push(delegation),
                Ok(_) => {}
                Err(err) => warn!(file = %name, error = %err, "skipping undecodable delegation"),
            }
        }
        sort_oldest_first(&mut selected);
        Ok(selected)
    }
}

async fn run_blocking<F, T>(operation: F) -> DelegationRepositoryResult<T>
where
    F: FnOnce() -> DelegationRepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|err| DelegationRepositoryError::persistence(std::io::Error::other(err.to_string())))?
}

#[async_trait]
impl DelegationRepository for JsonFileDelegationRepository {
    async fn insert(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let inner = Arc::clone(&self.inner);
        let owned = delegation.clone();
        run_blocking(move || inner.insert(&owned)).await
    }

    async fn update(&self, delegation: &Delegation) -> DelegationRepositoryResult<()> {
        let inner = Arc::clone(&self.inner);
        let owned = delegation.clone();
        run_blocking(move || inner.update(&owned)).await
    }

    async fn find(&self, handle: DelegationHandle) -> DelegationRepositoryResult<Option<Delegation>> {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || inner.read(handle)).await
    }

    async fn list_for_task(&self, task_id: &RecordId) -> DelegationRepositoryResult<Vec<Delegation>> {
        let inner = Arc::clone(&self.inner);
        let wanted = task_id.clone();
        run_blocking(move || inner.select(|delegation| delegation.task_id == wanted)).await
    }

    async fn list_outstanding(&self) -> DelegationRepositoryResult<Vec<Delegation>> {
        let inner = Arc::clone(&self.inner);
        run_blocking(move || inner.select(|delegation| delegation.state.is_outstanding())).await
    }
}
