//! Task store: record persistence, graph queries and integrity checks.
//!
//! - Port contract in [`ports`]
//! - In-memory and filesystem backends in [`adapters`]
//! - Dependency graph algorithms in [`graph`]
//! - The [`services::TaskStore`] service enforcing record invariants

pub mod adapters;
pub mod graph;
pub mod ports;
pub mod query;
pub mod services;

#[cfg(test)]
mod tests;
