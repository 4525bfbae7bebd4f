//! Record aggregate root.

use super::{ActorId, LogEntry, Priority, RecordDomainError, RecordId, RecordKind, RecordStatus};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::{BTreeMap, BTreeSet};

/// Metadata keys the ledger interprets. The side-map never holds them.
pub const RESERVED_METADATA_KEYS: [&str; 17] = [
    "id",
    "title",
    "kind",
    "status",
    "priority",
    "created_date",
    "updated_date",
    "created_at",
    "updated_at",
    "revision",
    "parent",
    "depends_on",
    "tags",
    "assigned_to",
    "reporter",
    "owner",
    "schema_ref",
];

/// Ledger record: structured metadata plus a Markdown body.
///
/// Status is read-only from outside the crate; it only moves through the
/// lifecycle engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    title: String,
    kind: RecordKind,
    status: RecordStatus,
    priority: Priority,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    revision: u64,
    parent: Option<RecordId>,
    depends_on: BTreeSet<RecordId>,
    tags: BTreeSet<String>,
    assigned_to: Option<String>,
    reporter: Option<String>,
    owner: Option<String>,
    schema_ref: Option<String>,
    extra: BTreeMap<String, serde_yaml::Value>,
    body: String,
}

/// Parameter object for reconstructing a persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecordData {
    /// Persisted identifier.
    pub id: RecordId,
    /// Persisted title.
    pub title: String,
    /// Persisted kind.
    pub kind: RecordKind,
    /// Persisted status.
    pub status: RecordStatus,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted last-mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted revision counter.
    pub revision: u64,
    /// Persisted parent reference.
    pub parent: Option<RecordId>,
    /// Persisted dependency set.
    pub depends_on: BTreeSet<RecordId>,
    /// Persisted tag set.
    pub tags: BTreeSet<String>,
    /// Persisted assignee.
    pub assigned_to: Option<String>,
    /// Persisted reporter.
    pub reporter: Option<String>,
    /// Persisted owner.
    pub owner: Option<String>,
    /// Persisted schema reference.
    pub schema_ref: Option<String>,
    /// Metadata keys the ledger does not interpret.
    pub extra: BTreeMap<String, serde_yaml::Value>,
    /// Persisted Markdown body.
    pub body: String,
}

/// Builder for new records in the `ToDo` status.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    id: RecordId,
    title: String,
    kind: RecordKind,
    priority: Priority,
    parent: Option<RecordId>,
    depends_on: BTreeSet<RecordId>,
    tags: BTreeSet<String>,
    assigned_to: Option<String>,
    reporter: Option<String>,
    owner: Option<String>,
    schema_ref: Option<String>,
    body: String,
}

impl RecordBuilder {
    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the parent record.
    #[must_use]
    pub fn with_parent(mut self, parent: RecordId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: RecordId) -> Self {
        self.depends_on.insert(dependency);
        self
    }

    /// Adds several dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = RecordId>) -> Self {
        self.depends_on.extend(dependencies);
        self
    }

    /// Adds tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    /// Sets the reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = Some(reporter.into());
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the schema reference.
    #[must_use]
    pub fn with_schema_ref(mut self, schema_ref: impl Into<String>) -> Self {
        self.schema_ref = Some(schema_ref.into());
        self
    }

    /// Sets the Markdown body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the identifier the record will carry.
    #[must_use]
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns the title the record will carry.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the kind the record will carry.
    #[must_use]
    pub const fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Returns the schema reference, if set.
    #[must_use]
    pub fn schema_ref(&self) -> Option<&str> {
        self.schema_ref.as_deref()
    }

    /// Returns `true` when a body has been supplied.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Builds a `ToDo` record stamped with the clock's current time.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDomainError::EmptyTitle`] when the title is blank.
    pub fn build(self, clock: &impl Clock) -> Result<Record, RecordDomainError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(RecordDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        Ok(Record {
            id: self.id,
            title,
            kind: self.kind,
            status: RecordStatus::ToDo,
            priority: self.priority,
            created_at: timestamp,
            updated_at: timestamp,
            revision: 0,
            parent: self.parent,
            depends_on: self.depends_on,
            tags: self.tags,
            assigned_to: self.assigned_to,
            reporter: self.reporter,
            owner: self.owner,
            schema_ref: self.schema_ref,
            extra: BTreeMap::new(),
            body: self.body,
        })
    }
}

impl Record {
    /// Starts building a new record.
    #[must_use]
    pub fn builder(id: RecordId, title: impl Into<String>, kind: RecordKind) -> RecordBuilder {
        RecordBuilder {
            id,
            title: title.into(),
            kind,
            priority: Priority::default(),
            parent: None,
            depends_on: BTreeSet::new(),
            tags: BTreeSet::new(),
            assigned_to: None,
            reporter: None,
            owner: None,
            schema_ref: None,
            body: String::new(),
        }
    }

    /// Reconstructs a record from persisted storage.
    ///
    /// Reserved keys in `data.extra` are discarded; the typed fields own
    /// them.
    #[must_use]
    pub fn from_persisted(mut data: PersistedRecordData) -> Self {
        data.extra
            .retain(|key, _| !RESERVED_METADATA_KEYS.contains(&key.as_str()));
        Self {
            id: data.id,
            title: data.title,
            kind: data.kind,
            status: data.status,
            priority: data.priority,
            created_at: data.created_at,
            updated_at: data.updated_at,
            revision: data.revision,
            parent: data.parent,
            depends_on: data.depends_on,
            tags: data.tags,
            assigned_to: data.assigned_to,
            reporter: data.reporter,
            owner: data.owner,
            schema_ref: data.schema_ref,
            extra: data.extra,
            body: data.body,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RecordStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the revision counter used for optimistic concurrency.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the parent reference, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&RecordId> {
        self.parent.as_ref()
    }

    /// Returns the dependency set.
    #[must_use]
    pub const fn depends_on(&self) -> &BTreeSet<RecordId> {
        &self.depends_on
    }

    /// Returns the tag set.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub fn assigned_to(&self) -> Option<&str> {
        self.assigned_to.as_deref()
    }

    /// Returns the reporter, if any.
    #[must_use]
    pub fn reporter(&self) -> Option<&str> {
        self.reporter.as_deref()
    }

    /// Returns the owner, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Returns the schema reference, if any.
    #[must_use]
    pub fn schema_ref(&self) -> Option<&str> {
        self.schema_ref.as_deref()
    }

    /// Returns metadata keys the ledger does not interpret.
    #[must_use]
    pub const fn extra(&self) -> &BTreeMap<String, serde_yaml::Value> {
        &self.extra
    }

    /// Returns the Markdown body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Replaces the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Replaces the parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: Option<RecordId>) -> Self {
        self.parent = parent;
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: RecordId) -> Self {
        self.depends_on.insert(dependency);
        self
    }

    /// Removes a dependency.
    #[must_use]
    pub fn without_dependency(mut self, dependency: &RecordId) -> Self {
        self.depends_on.remove(dependency);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Removes a tag.
    #[must_use]
    pub fn without_tag(mut self, tag: &str) -> Self {
        self.tags.remove(tag);
        self
    }

    /// Replaces the assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: Option<String>) -> Self {
        self.assigned_to = assignee;
        self
    }

    /// Replaces the reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Option<String>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    /// Replaces the schema reference.
    #[must_use]
    pub fn with_schema_ref(mut self, schema_ref: Option<String>) -> Self {
        self.schema_ref = schema_ref;
        self
    }

    /// Sets an uninterpreted metadata key.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDomainError::ReservedMetadataKey`] for a key listed
    /// in [`RESERVED_METADATA_KEYS`].
    pub fn with_extra(
        mut self,
        key: impl Into<String>,
        value: serde_yaml::Value,
    ) -> Result<Self, RecordDomainError> {
        let name = key.into();
        if RESERVED_METADATA_KEYS.contains(&name.as_str()) {
            return Err(RecordDomainError::ReservedMetadataKey(name));
        }
        self.extra.insert(name, value);
        Ok(self)
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a log entry to the body's log section.
    #[must_use]
    pub fn with_log_entry(mut self, entry: &LogEntry) -> Self {
        self.body = entry.append_to(&self.body);
        self
    }

    /// Checks the invariants a record must satisfy on its own.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDomainError::EmptyTitle`] for a blank title.
    pub fn validate(&self) -> Result<(), RecordDomainError> {
        if self.title.trim().is_empty() {
            return Err(RecordDomainError::EmptyTitle);
        }
        Ok(())
    }

    /// Moves the record to `target` and logs the change on behalf of `actor`.
    ///
    /// Legality is decided by the lifecycle engine before this is called.
    pub(crate) fn apply_status(
        &mut self,
        target: RecordStatus,
        actor: &ActorId,
        clock: &impl Clock,
    ) {
        let entry = LogEntry::status_change(clock.utc(), actor.clone(), self.status, target);
        self.body = entry.append_to(&self.body);
        self.status = target;
    }

    /// Advances `updated_at` and the revision for a committed write.
    ///
    /// `updated_at` moves forward even when the clock has not, so successive
    /// writes always carry increasing timestamps.
    pub(crate) fn stamp_commit(&mut self, previous: &Self, clock: &impl Clock) {
        let now = clock.utc();
        self.updated_at = if now > previous.updated_at {
            now
        } else {
            previous.updated_at + TimeDelta::microseconds(1)
        };
        self.revision = previous.revision + 1;
    }

    /// Resets bookkeeping for a first write.
    pub(crate) const fn stamp_create(&mut self) {
        self.revision = 1;
    }
}
