//! Notification contract for archived records.

use crate::record::domain::Record;
use async_trait::async_trait;

/// Receives records right after the lifecycle engine archives them.
#[async_trait]
pub trait ArchiveHook: Send + Sync {
    /// Called once per committed archive transition.
    async fn record_archived(&self, record: &Record);
}
