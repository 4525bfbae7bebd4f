//! Record repository adapters.

pub mod filesystem;
pub mod memory;

pub use filesystem::{FileSystemRecordRepository, KindDirectoryStrategy, PathStrategy};
pub use memory::InMemoryRecordRepository;
