//! Domain model for ledger records.
//!
//! Records are plain values: the store decides where they live and the
//! lifecycle engine decides how their status moves. Presentation concerns
//! such as emoji status labels are kept at the serialization boundary.

mod error;
mod ids;
mod kind;
mod log;
mod priority;
mod record;
mod status;

pub use error::{
    ParsePriorityError, ParseRecordKindError, ParseRecordStatusError, RecordDomainError,
};
pub use ids::{ActorId, RecordId};
pub use kind::{CustomKind, RecordKind};
pub use log::{LOG_HEADING, LogEntry, LogEvent};
pub use priority::Priority;
pub use record::{PersistedRecordData, RESERVED_METADATA_KEYS, Record, RecordBuilder};
pub use status::RecordStatus;
