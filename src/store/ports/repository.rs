//! Repository port for record persistence.

use crate::record::{codec::CodecError, domain::{Record, RecordId}};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for record repository operations.
pub type RecordRepositoryResult<T> = Result<T, RecordRepositoryError>;

/// Record persistence contract.
///
/// Implementations must allow concurrent readers and make each write atomic
/// with respect to the check that guards it.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordRepositoryError::DuplicateId`] when the identifier is
    /// already taken. The check and the write are atomic.
    async fn insert(&self, record: &Record) -> RecordRepositoryResult<()>;

    /// Replaces a stored record if its stored revision equals
    /// `expected_revision`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordRepositoryError::NotFound`] when the record does not
    /// exist and [`RecordRepositoryError::ConcurrentModification`] when the
    /// stored revision differs.
    async fn replace(&self, record: &Record, expected_revision: u64) -> RecordRepositoryResult<()>;

    /// Finds a record by identifier.
    ///
    /// Returns `None` when the record does not exist.
    async fn find_by_id(&self, id: &RecordId) -> RecordRepositoryResult<Option<Record>>;

    /// Returns every stored record, ordered by identifier.
    async fn list(&self) -> RecordRepositoryResult<Vec<Record>>;
}

/// Errors returned by record repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RecordRepositoryError {
    /// A record with the same identifier already exists.
    #[error("duplicate record identifier: {0}")]
    DuplicateId(RecordId),

    /// The record was not found.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The stored record changed since it was read.
    #[error("record {id} was modified concurrently (expected revision {expected}, found {actual})")]
    ConcurrentModification {
        /// Record identifier.
        id: RecordId,
        /// Revision the caller read.
        expected: u64,
        /// Revision currently stored.
        actual: u64,
    },

    /// A document the ledger wrote can no longer be decoded.
    #[error("stored document {location} is corrupt: {source}")]
    Corrupted {
        /// Where the document lives.
        location: String,
        /// Decoding failure.
        source: CodecError,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RecordRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
