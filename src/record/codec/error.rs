//! Errors raised while decoding or encoding record documents.

use thiserror::Error;

/// Errors returned by the document codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The document structure could not be read.
    #[error("malformed document: {reason}")]
    MalformedDocument {
        /// What was wrong with the document.
        reason: String,
    },

    /// Required metadata keys are missing.
    #[error("schema violation: missing required key(s) {}", .missing.join(", "))]
    SchemaViolation {
        /// Names of the missing keys, in schema order.
        missing: Vec<String>,
    },

    /// A metadata key is present but its value is unusable.
    #[error("schema violation: invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Metadata could not be serialized.
    #[error("failed to serialize metadata: {0}")]
    Serialize(String),
}

impl CodecError {
    /// Creates a malformed-document error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
