//! Delegation repository adapters.

mod json_file;
mod memory;

pub use json_file::{DELEGATION_DIRECTORY, JsonFileDelegationRepository};
pub use memory::InMemoryDelegationRepository;
