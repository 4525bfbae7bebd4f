//! Error types for record domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing domain record values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordDomainError {
    /// The record identifier is unusable.
    #[error("invalid record identifier '{value}': {reason}")]
    InvalidRecordId {
        /// The rejected identifier.
        value: String,
        /// Why the identifier was rejected.
        reason: &'static str,
    },

    /// The actor identifier is empty after trimming.
    #[error("actor identifier must not be empty")]
    EmptyActorId,

    /// The record title is empty after trimming.
    #[error("record title must not be empty")]
    EmptyTitle,

    /// A side-map key collides with a key the ledger interprets.
    #[error("metadata key '{0}' is reserved")]
    ReservedMetadataKey(String),
}

/// Error returned while parsing record statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown record status: {0}")]
pub struct ParseRecordStatusError(pub String);

/// Error returned while parsing record kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid record kind: '{0}'")]
pub struct ParseRecordKindError(pub String);

/// Error returned while parsing priorities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority: {0}")]
pub struct ParsePriorityError(pub String);
