//! Workledger: a structured task and workflow ledger.
//!
//! Units of work are records: Markdown documents with a structured metadata
//! block. The ledger enforces a lifecycle state machine over them, tracks
//! dependency and hierarchy relationships, and mediates the delegation of
//! work between actors with validation gates and failure escalation.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Trait interfaces for persistence and collaborators
//! - **Adapters**: In-memory and filesystem implementations of the ports
//! - **Services**: Orchestration over the ports
//!
//! # Modules
//!
//! - [`record`]: Record model, document codec and body templates
//! - [`store`]: Task store with identity, hierarchy and dependency checks
//! - [`lifecycle`]: Lifecycle engine and validation gates
//! - [`delegation`]: Delegation coordinator and its timeout watcher
//! - [`config`]: TOML configuration
//! - [`ledger`]: Assembly of one ledger instance
//! - [`error`]: Crate-level error and exit-code classification
//! - [`clock`]: Manually driven clock for deterministic tests

pub mod clock;
pub mod config;
pub mod delegation;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod record;
pub mod store;
