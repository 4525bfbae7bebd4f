//! Mapping from records to document paths inside the ledger root.

use crate::record::domain::{Record, RecordKind};
use camino::Utf8PathBuf;
use std::collections::BTreeMap;

/// File extension of record documents.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Decides where a record's document lives, relative to the ledger root.
pub trait PathStrategy: Send + Sync {
    /// Returns the relative path of the document for `record`.
    fn relative_path(&self, record: &Record) -> Utf8PathBuf;
}

/// Stores each record as `<kind directory>/<id>.md`.
///
/// Directories default to [`RecordKind::default_directory`] and can be
/// overridden per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindDirectoryStrategy {
    overrides: BTreeMap<String, Utf8PathBuf>,
}

impl KindDirectoryStrategy {
    /// Creates a strategy using the default directory for every kind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the directory used for `kind`.
    #[must_use]
    pub fn with_directory(mut self, kind: &RecordKind, directory: impl Into<Utf8PathBuf>) -> Self {
        self.overrides
            .insert(kind.as_str().to_owned(), directory.into());
        self
    }

    /// Returns the directory used for `kind`.
    #[must_use]
    pub fn directory_for(&self, kind: &RecordKind) -> Utf8PathBuf {
        self.overrides
            .get(kind.as_str())
            .cloned()
            .unwrap_or_else(|| Utf8PathBuf::from(kind.default_directory()))
    }
}

impl PathStrategy for KindDirectoryStrategy {
    fn relative_path(&self, record: &Record) -> Utf8PathBuf {
        let mut path = self.directory_for(record.kind());
        path.push(format!("{}.{DOCUMENT_EXTENSION}", record.id()));
        path
    }
}
