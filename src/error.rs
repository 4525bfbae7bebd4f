//! Crate-level error type and its stable classification.
//!
//! Each layer keeps its own error enum. [`LedgerError`] gathers them for
//! callers that drive a whole ledger, and [`ErrorKind`] classifies any of
//! them into the small, stable taxonomy the CLI maps to exit codes.

use crate::config::ConfigError;
use crate::delegation::error::DelegationError;
use crate::delegation::ports::DelegationRepositoryError;
use crate::lifecycle::services::LifecycleError;
use crate::record::codec::CodecError;
use crate::record::domain::RecordDomainError;
use crate::record::template::TemplateError;
use crate::store::ports::RecordRepositoryError;
use crate::store::services::RecordStoreError;
use std::fmt;
use thiserror::Error;

/// Stable classification of ledger failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unexpected failure, typically I/O.
    Internal,
    /// A record or delegation does not exist.
    NotFound,
    /// The state machine refused a transition.
    IllegalTransition,
    /// A dependency cycle was found.
    CycleDetected,
    /// A record identifier is already taken.
    DuplicateId,
    /// A document could not be parsed.
    MalformedDocument,
    /// A document is missing required metadata or has unusable values.
    SchemaViolation,
    /// A write lost an optimistic-concurrency race.
    ConcurrentModification,
    /// The record cannot be delegated in its status.
    TaskNotDelegatable,
    /// A delegation outcome arrived after the deadline.
    DelegationTimedOut,
    /// A validation gate failed.
    ValidationBlocked,
    /// Caller-supplied data was rejected.
    InvalidInput,
    /// Stored data is inconsistent or unreadable.
    Integrity,
    /// The command line could not be parsed.
    Usage,
}

impl ErrorKind {
    /// Returns the process exit code for this kind.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::NotFound => 2,
            Self::IllegalTransition => 3,
            Self::CycleDetected => 4,
            Self::DuplicateId => 5,
            Self::MalformedDocument => 6,
            Self::SchemaViolation => 7,
            Self::ConcurrentModification => 8,
            Self::TaskNotDelegatable => 9,
            Self::DelegationTimedOut => 10,
            Self::ValidationBlocked => 11,
            Self::InvalidInput => 12,
            Self::Integrity => 13,
            Self::Usage => 64,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::NotFound => "not_found",
            Self::IllegalTransition => "illegal_transition",
            Self::CycleDetected => "cycle_detected",
            Self::DuplicateId => "duplicate_id",
            Self::MalformedDocument => "malformed_document",
            Self::SchemaViolation => "schema_violation",
            Self::ConcurrentModification => "concurrent_modification",
            Self::TaskNotDelegatable => "task_not_delegatable",
            Self::DelegationTimedOut => "delegation_timed_out",
            Self::ValidationBlocked => "validation_blocked",
            Self::InvalidInput => "invalid_input",
            Self::Integrity => "integrity",
            Self::Usage => "usage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can be classified into an [`ErrorKind`].
pub trait Classify {
    /// Returns the classification of this error.
    fn kind(&self) -> ErrorKind;
}

impl Classify for CodecError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            Self::SchemaViolation { .. } | Self::InvalidValue { .. } => ErrorKind::SchemaViolation,
            Self::Serialize(_) => ErrorKind::Internal,
        }
    }
}

impl Classify for RecordRepositoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateId(_) => ErrorKind::DuplicateId,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            Self::Corrupted { .. } => ErrorKind::Integrity,
            Self::Persistence(_) => ErrorKind::Internal,
        }
    }
}

impl Classify for RecordStoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TaskNotFound(_) => ErrorKind::NotFound,
            Self::CycleDetected(_) => ErrorKind::CycleDetected,
            Self::UnknownDependency { .. }
            | Self::UnresolvedParent { .. }
            | Self::InvalidMutation { .. }
            | Self::TombstoneLive(_)
            | Self::Domain(_) => ErrorKind::InvalidInput,
            Self::Repository(err) => err.kind(),
        }
    }
}

impl Classify for LifecycleError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            Self::ValidationBlocked { .. } => ErrorKind::ValidationBlocked,
            Self::Store(err) => err.kind(),
        }
    }
}

impl Classify for DelegationRepositoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Duplicate(_) | Self::Persistence(_) => ErrorKind::Internal,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Corrupted { .. } => ErrorKind::Integrity,
        }
    }
}

impl Classify for DelegationError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TaskNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::TaskNotDelegatable { .. } => ErrorKind::TaskNotDelegatable,
            Self::InvalidTransition { .. } => ErrorKind::IllegalTransition,
            Self::DelegationTimedOut(_) => ErrorKind::DelegationTimedOut,
            Self::InvalidTimeout | Self::Domain(_) => ErrorKind::InvalidInput,
            Self::Lifecycle(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Repository(err) => err.kind(),
        }
    }
}

/// Any error raised while driving a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A document could not be decoded or encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A body template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A record value was invalid.
    #[error(transparent)]
    Domain(#[from] RecordDomainError),

    /// Record persistence failed.
    #[error(transparent)]
    Repository(#[from] RecordRepositoryError),

    /// A task store operation failed.
    #[error(transparent)]
    Store(#[from] RecordStoreError),

    /// A lifecycle transition failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Delegation persistence failed.
    #[error(transparent)]
    DelegationRepository(#[from] DelegationRepositoryError),

    /// A delegation operation failed.
    #[error(transparent)]
    Delegation(#[from] DelegationError),

    /// Caller input was rejected before reaching the ledger.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The ledger holds inconsistent or unreadable data.
    #[error("ledger integrity check found {problems} problem(s)")]
    Integrity {
        /// Number of problems found.
        problems: usize,
    },

    /// Reading or writing outside the ledger failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Codec(err) => err.kind(),
            Self::Repository(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Lifecycle(err) => err.kind(),
            Self::DelegationRepository(err) => err.kind(),
            Self::Delegation(err) => err.kind(),
            Self::Config(_) | Self::Template(_) | Self::Domain(_) | Self::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for ledger-level operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
