//! Application services for the task store.

mod task_store;

pub use task_store::{IntegrityWarning, RecordStoreError, RecordStoreResult, TaskStore};
