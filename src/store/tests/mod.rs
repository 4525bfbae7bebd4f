//! Unit tests for the task store.

mod graph_tests;

use crate::clock::ManualClock;
use crate::record::domain::{Record, RecordId, RecordKind};

pub(super) fn record_id(value: &str) -> RecordId {
    RecordId::new(value).expect("valid record id")
}

pub(super) fn task(id: &str, depends_on: &[&str]) -> Record {
    Record::builder(record_id(id), format!("Task {id}"), RecordKind::Task)
        .with_dependencies(depends_on.iter().map(|dependency| record_id(dependency)))
        .build(&ManualClock::default())
        .expect("valid record")
}
