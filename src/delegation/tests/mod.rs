//! Unit tests for delegation.


use crate::record::domain::{ActorId, RecordId};

pub(super) fn record_id(value: &str) -> RecordId {
    RecordId::new(value).expect("valid record id")
}

pub(super) fn actor_id(value: &str) -> ActorId {
    ActorId::new(value).expect("valid actor id")
}
