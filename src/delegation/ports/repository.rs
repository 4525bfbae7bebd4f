//! Repository port for delegation persistence.

use crate::delegation::domain::{Delegation, DelegationHandle};
use crate::record::domain::RecordId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for delegation repository operations.
pub type DelegationRepositoryResult<T> = Result<T, DelegationRepositoryError>;

/// Delegation persistence contract.
#[async_trait]
pub trait DelegationRepository: Send + Sync {
    /// Stores a new delegation.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationRepositoryError::Duplicate`] when the handle is
    /// already stored.
    async fn insert(&self, delegation: &Delegation) -> DelegationRepositoryResult<()>;

    /// Replaces a stored delegation.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationRepositoryError::NotFound`] when the handle is
    /// unknown.
    async fn update(&self, delegation: &Delegation) -> DelegationRepositoryResult<()>;

    /// Finds a delegation by handle.
    async fn find(&self, handle: DelegationHandle) -> DelegationRepositoryResult<Option<Delegation>>;

    /// Returns every delegation of a record, oldest first.
    async fn list_for_task(&self, task_id: &RecordId) -> DelegationRepositoryResult<Vec<Delegation>>;

    /// Returns every delegation still owing an outcome, oldest first.
    async fn list_outstanding(&self) -> DelegationRepositoryResult<Vec<Delegation>>;
}

/// Errors returned by delegation repository implementations.
#[derive(Debug, Clone, Error)]
pub enum DelegationRepositoryError {
    /// A delegation with the same handle already exists.
    #[error("duplicate delegation handle: {0}")]
    Duplicate(DelegationHandle),

    /// The delegation was not found.
    #[error("delegation not found: {0}")]
    NotFound(DelegationHandle),

    /// A stored delegation can no longer be decoded.
    #[error("stored delegation {location} is corrupt: {reason}")]
    Corrupted {
        /// Where the delegation lives.
        location: String,
        /// Decoding failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DelegationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
