//! In-memory record repository for tests and ephemeral ledgers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::record::domain::{Record, RecordId};
use crate::store::ports::{RecordRepository, RecordRepositoryError, RecordRepositoryResult};

/// Thread-safe in-memory record repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordRepository {
    records: Arc<RwLock<HashMap<RecordId, Record>>>,
}

impl InMemoryRecordRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl ToString) -> RecordRepositoryError {
    RecordRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn insert(&self, record: &Record) -> RecordRepositoryResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(record.id()) {
            return Err(RecordRepositoryError::DuplicateId(record.id().clone()));
        }
        records.insert(record.id().clone(), record.clone());
        Ok(())
    }

    async fn replace(&self, record: &Record, expected_revision: u64) -> RecordRepositoryResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        let stored = records
            .get_mut(record.id())
            .ok_or_else(|| RecordRepositoryError::NotFound(record.id().clone()))?;
        if stored.revision() != expected_revision {
            return Err(RecordRepositoryError::ConcurrentModification {
                id: record.id().clone(),
                expected: expected_revision,
                actual: stored.revision(),
            });
        }
        *stored = record.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &RecordId) -> RecordRepositoryResult<Option<Record>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(id).cloned())
    }

    async fn list(&self) -> RecordRepositoryResult<Vec<Record>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut all: Vec<Record> = records.values().cloned().collect();
        all.sort_by(|left, right| left.id().cmp(right.id()));
        Ok(all)
    }
}
