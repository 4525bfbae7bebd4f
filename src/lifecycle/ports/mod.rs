//! Lifecycle ports.

mod archive_hook;
mod gate;

pub use archive_hook::ArchiveHook;
pub use gate::ValidationGate;
