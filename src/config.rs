//! Ledger configuration.
//!
//! Configuration is a TOML document. Every section is optional:
//!
//! ```toml
//! root = "work"
//! coordinator = "lead"
//! storage = "filesystem"
//! tombstones = ["T-0042"]
//!
//! [paths]
//! task = "backlog/tasks"
//!
//! [delegation]
//! default_timeout_secs = 3600
//! watch_interval_ms = 1000
//!
//! [lifecycle]
//! require_dependencies_to_start = true
//!
//! [gates.task]
//! required_sections = ["Acceptance Criteria"]
//! checklist = true
//!
//! [gates.all]
//! require_assignee = true
//!
//! [templates]
//! spike = "# {{ title }}\n\n## Question\n"
//! ```
//!
//! A relative `root` is resolved against the directory holding the
//! configuration file.

use crate::lifecycle::adapters::{AssigneeGate, ChecklistGate, RequiredSectionsGate};
use crate::lifecycle::services::{GateRegistry, GateScope, LifecyclePolicy};
use crate::record::domain::{ActorId, RecordId, RecordKind};
use crate::record::template::TemplateCatalog;
use crate::store::adapters::KindDirectoryStrategy;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Gate section key applying to every kind.
pub const ALL_KINDS_KEY: &str = "all";

/// File name looked up when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// File that was read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[source] Box<toml::de::Error>),

    /// A value parsed but is unusable.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted key path.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(Box::new(err))
    }
}

/// Record persistence used by a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One Markdown document per record under the ledger root.
    #[default]
    Filesystem,
    /// Process-local storage, discarded on exit.
    Memory,
}

/// Delegation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DelegationConfig {
    /// Timeout applied when a delegation does not name one.
    pub default_timeout_secs: i64,
    /// How often the timeout watcher checks deadlines.
    pub watch_interval_ms: u64,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 3_600,
            watch_interval_ms: 1_000,
        }
    }
}

/// Lifecycle settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Require done dependencies before work starts.
    pub require_dependencies_to_start: bool,
}

/// Built-in gates enabled for one kind, or for all kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Body headings that must exist before review or done.
    pub required_sections: Vec<String>,
    /// Ask for review while checklist items are unchecked.
    pub checklist: bool,
    /// Require an assignee before review.
    pub require_assignee: bool,
}

/// Top-level ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Directory holding the ledger.
    pub root: Utf8PathBuf,
    /// Actor the coordinator acts as.
    pub coordinator: String,
    /// Record persistence.
    pub storage: StorageBackend,
    /// Identifiers intentionally removed from the ledger.
    pub tombstones: Vec<String>,
    /// Per-kind directory overrides, keyed by kind name.
    pub paths: BTreeMap<String, Utf8PathBuf>,
    /// Delegation settings.
    pub delegation: DelegationConfig,
    /// Lifecycle settings.
    pub lifecycle: LifecycleConfig,
    /// Gate settings keyed by kind name or [`ALL_KINDS_KEY`].
    pub gates: BTreeMap<String, GateConfig>,
    /// Body template overrides keyed by kind name or schema reference.
    pub templates: BTreeMap<String, String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            coordinator: "coordinator".to_owned(),
            storage: StorageBackend::default(),
            tombstones: Vec::new(),
            paths: BTreeMap::new(),
            delegation: DelegationConfig::default(),
            lifecycle: LifecycleConfig::default(),
            gates: BTreeMap::new(),
            templates: BTreeMap::new(),
        }
    }
}

impl LedgerConfig {
    /// Creates the default configuration for a ledger at `root`.
    #[must_use]
    pub fn for_root(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::InvalidValue`] for unusable values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file, resolving a relative root against the
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// as [`Self::from_toml`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source| ConfigError::Read {
            path: path.to_owned(),
            source,
        };
        let directory = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "configuration path names no file",
            ))
        })?;
        let dir = Dir::open_ambient_dir(directory, ambient_authority()).map_err(read_error)?;
        let content = dir.read_to_string(file_name).map_err(read_error)?;
        let mut config = Self::from_toml(&content)?;
        if config.root.is_relative() {
            config.root = directory.join(&config.root);
        }
        Ok(config)
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coordinator_actor()?;
        self.tombstone_ids()?;
        self.path_strategy()?;
        self.gate_registry()?;
        if self.delegation.default_timeout_secs <= 0 {
            return Err(ConfigError::invalid(
                "delegation.default_timeout_secs",
                "must be positive",
            ));
        }
        if self.delegation.watch_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "delegation.watch_interval_ms",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Returns the coordinating actor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the name is blank.
    pub fn coordinator_actor(&self) -> Result<ActorId, ConfigError> {
        ActorId::new(self.coordinator.as_str()).map_err(|err| ConfigError::invalid("coordinator", err))
    }

    /// Returns the tombstoned identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an invalid identifier.
    pub fn tombstone_ids(&self) -> Result<Vec<RecordId>, ConfigError> {
        self.tombstones
            .iter()
            .map(|raw| RecordId::new(raw.as_str()).map_err(|err| ConfigError::invalid("tombstones", err)))
            .collect()
    }

    /// Builds the directory strategy for the filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unusable kind name or an
    /// absolute or escaping directory.
    pub fn path_strategy(&self) -> Result<KindDirectoryStrategy, ConfigError> {
        let mut strategy = KindDirectoryStrategy::new();
        for (name, directory) in &self.paths {
            let field = format!("paths.{name}");
            let kind = parse_kind(&field, name)?;
            let escapes = directory
                .components()
                .any(|component| matches!(component, camino::Utf8Component::ParentDir));
            if directory.is_absolute() || escapes {
                return Err(ConfigError::invalid(field, "must stay inside the ledger root"));
            }
            strategy = strategy.with_directory(&kind, directory.clone());
        }
        Ok(strategy)
    }

    /// Builds the gate registry from the `[gates]` sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unusable kind name.
    pub fn gate_registry(&self) -> Result<GateRegistry, ConfigError> {
        let mut registry = GateRegistry::new();
        for (name, gates) in &self.gates {
            let scope = if name == ALL_KINDS_KEY {
                GateScope::AllKinds
            } else {
                GateScope::Kind(parse_kind(&format!("gates.{name}"), name)?)
            };
            if !gates.required_sections.is_empty() {
                registry.register(
                    scope.clone(),
                    Arc::new(RequiredSectionsGate::new(gates.required_sections.iter().cloned())),
                );
            }
            if gates.checklist {
                registry.register(scope.clone(), Arc::new(ChecklistGate));
            }
            if gates.require_assignee {
                registry.register(scope, Arc::new(AssigneeGate));
            }
        }
        Ok(registry)
    }

    /// Builds the template catalog: built-ins plus overrides.
    #[must_use]
    pub fn template_catalog(&self) -> TemplateCatalog {
        self.templates
            .iter()
            .fold(TemplateCatalog::new(), |catalog, (name, source)| {
                catalog.with_template(name.as_str(), source.as_str())
            })
    }

    /// Returns the lifecycle policy.
    #[must_use]
    pub const fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            require_dependencies_to_start: self.lifecycle.require_dependencies_to_start,
        }
    }

    /// Returns the default delegation timeout.
    #[must_use]
    pub fn default_timeout(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.delegation.default_timeout_secs).unwrap_or(TimeDelta::MAX)
    }

    /// Returns the timeout watcher period.
    #[must_use]
    pub const fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.delegation.watch_interval_ms)
    }
}

fn parse_kind(field: &str, name: &str) -> Result<RecordKind, ConfigError> {
    RecordKind::try_from(name).map_err(|err| ConfigError::invalid(field, err))
}
