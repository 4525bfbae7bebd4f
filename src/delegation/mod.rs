//! Delegation of record work between actors.
//!
//! A coordinating actor hands a record to a delegate, which accepts, works
//! and reports an outcome. Deadlines are measured against the injected
//! clock; overdue work times out, and failed or timed-out work can be
//! escalated back to the coordinator. Nothing is retried automatically.
//!
//! - Delegation state machine and events in [`domain`]
//! - Persistence and actor contracts in [`ports`]
//! - In-memory and JSON-file persistence in [`adapters`]
//! - The [`services::DelegationCoordinator`] and its timeout watcher

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
