//! Declarative record filters.

use crate::record::domain::{Record, RecordId, RecordKind, RecordStatus};

/// Conjunctive filter over records; unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    kind: Option<RecordKind>,
    status: Option<RecordStatus>,
    tag: Option<String>,
    assignee: Option<String>,
    parent: Option<RecordId>,
}

impl RecordQuery {
    /// Creates a query matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to one kind.
    #[must_use]
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts results to one status.
    #[must_use]
    pub const fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts results to records carrying `tag`.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Restricts results to records assigned to `assignee`.
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Restricts results to direct children of `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: RecordId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Returns whether `record` satisfies every configured criterion.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.kind.as_ref().is_none_or(|kind| record.kind() == kind)
            && self.status.is_none_or(|status| record.status() == status)
            && self
                .tag
                .as_ref()
                .is_none_or(|tag| record.tags().contains(tag))
            && self
                .assignee
                .as_deref()
                .is_none_or(|assignee| record.assigned_to() == Some(assignee))
            && self
                .parent
                .as_ref()
                .is_none_or(|parent| record.parent() == Some(parent))
    }
}
