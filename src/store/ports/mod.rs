//! Port contracts for record persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by the task store.

pub mod repository;

pub use repository::{RecordRepository, RecordRepositoryError, RecordRepositoryResult};
