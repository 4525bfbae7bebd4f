//! Unit tests for the lifecycle module.


use crate::clock::ManualClock;
use crate::record::domain::{ActorId, Record, RecordId, RecordKind};

pub(super) fn record_id(value: &str) -> RecordId {
    RecordId::new(value).expect("valid record id")
}

pub(super) fn actor() -> ActorId {
    ActorId::new("ada").expect("valid actor id")
}

pub(super) fn task(id: &str, depends_on: &[&str]) -> Record {
    Record::builder(record_id(id), format!("Task {id}"), RecordKind::Task)
        .with_dependencies(depends_on.iter().map(|dependency| record_id(dependency)))
        .build(&ManualClock::default())
        .expect("valid record")
}

/// Returns `record` as if it had been moved to `status` by `ada`.
pub(super) fn in_status(
    mut record: Record,
    status: crate::record::domain::RecordStatus,
) -> Record {
    record.apply_status(status, &actor(), &ManualClock::default());
    record
}
