//! Record kinds.

use super::ParseRecordKindError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Variant of a ledger record.
///
/// All kinds share one record shape; the kind selects directory placement,
/// body templates and the validation gates that apply. Kinds the ledger does
/// not know by name are carried as [`RecordKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordKind {
    /// Large body of work grouping features.
    Epic,
    /// User-visible capability grouping tasks.
    Feature,
    /// Unit of implementation work.
    Task,
    /// Defect report.
    Bug,
    /// Maintenance work.
    Chore,
    /// Documentation work.
    Documentation,
    /// Test work.
    Test,
    /// Time-boxed investigation.
    Spike,
    /// Architecture decision record.
    Adr,
    /// Project guideline.
    Guideline,
    /// Workflow definition.
    Workflow,
    /// Any other kind. Built through [`RecordKind::custom`] or parsing, so
    /// it never shadows a known kind.
    Other(CustomKind),
}

/// Name of a kind the ledger does not know: lower-case ASCII letters,
/// digits, `-` and `_`, never one of the known names or their aliases.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomKind(String);

impl CustomKind {
    /// Returns the normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RecordKind {
    /// Kinds known by name.
    pub const KNOWN: [Self; 11] = [
        Self::Epic,
        Self::Feature,
        Self::Task,
        Self::Bug,
        Self::Chore,
        Self::Documentation,
        Self::Test,
        Self::Spike,
        Self::Adr,
        Self::Guideline,
        Self::Workflow,
    ];

    /// Parses a kind name and insists that it is not a known kind.
    ///
    /// # Errors
    ///
    /// Returns [`ParseRecordKindError`] for unusable names and for names
    /// that resolve to a known kind, such as `Task` or `docs`.
    pub fn custom(name: &str) -> Result<Self, ParseRecordKindError> {
        match Self::try_from(name)? {
            custom @ Self::Other(_) => Ok(custom),
            _ => Err(ParseRecordKindError(name.to_owned())),
        }
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Chore => "chore",
            Self::Documentation => "documentation",
            Self::Test => "test",
            Self::Spike => "spike",
            Self::Adr => "adr",
            Self::Guideline => "guideline",
            Self::Workflow => "workflow",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Returns the default directory name used for records of this kind.
    #[must_use]
    pub fn default_directory(&self) -> String {
        match self {
            Self::Documentation => "docs".to_owned(),
            Self::Adr => "decisions".to_owned(),
            other => format!("{}s", other.as_str()),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RecordKind {
    type Error = ParseRecordKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "epic" => Self::Epic,
            "feature" => Self::Feature,
            "task" => Self::Task,
            "bug" => Self::Bug,
            "chore" => Self::Chore,
            "documentation" | "docs" => Self::Documentation,
            "test" => Self::Test,
            "spike" => Self::Spike,
            "adr" | "decision" => Self::Adr,
            "guideline" => Self::Guideline,
            "workflow" => Self::Workflow,
            "" => return Err(ParseRecordKindError(value.to_owned())),
            other => {
                let usable = other
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'));
                if !usable {
                    return Err(ParseRecordKindError(value.to_owned()));
                }
                Self::Other(CustomKind(other.to_owned()))
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for RecordKind {
    type Error = ParseRecordKindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<RecordKind> for String {
    fn from(value: RecordKind) -> Self {
        value.as_str().to_owned()
    }
}
