//! Record lifecycle: the status state machine and its validation gates.
//!
//! - Transition decisions and gate reports in [`domain`]
//! - The validation gate and archive hook contracts in [`ports`]
//! - Built-in gates in [`adapters`]
//! - The [`services::LifecycleEngine`] applying transitions through the task
//!   store

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
