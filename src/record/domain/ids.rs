//! Identifier types for the record domain.

use super::RecordDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, immutable identifier of a ledger record (for example `TASK-042`).
///
/// Identifiers double as file stems in the filesystem backend, so they may
/// not contain whitespace or path separators and may not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Creates a validated record identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDomainError::InvalidRecordId`] when the value is
    /// empty, contains whitespace or a path separator, or starts with `.`.
    pub fn new(value: impl Into<String>) -> Result<Self, RecordDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let rejection = if trimmed.is_empty() {
            Some("identifier must not be empty")
        } else if trimmed.chars().any(char::is_whitespace) {
            Some("identifier must not contain whitespace")
        } else if trimmed.contains(['/', '\\']) {
            Some("identifier must not contain path separators")
        } else if trimmed.starts_with('.') {
            Some("identifier must not start with '.'")
        } else {
            None
        };

        match rejection {
            Some(reason) => Err(RecordDomainError::InvalidRecordId { value: raw, reason }),
            None => Ok(Self(trimmed.to_owned())),
        }
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text identifier of an actor (human or automated agent role).
///
/// Actors are not checked against any registry; the only requirement is a
/// non-empty name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    /// Creates a validated actor identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDomainError::EmptyActorId`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, RecordDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RecordDomainError::EmptyActorId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActorId {
    type Error = RecordDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActorId> for String {
    fn from(value: ActorId) -> Self {
        value.0
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
