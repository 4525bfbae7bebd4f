//! Lifecycle services.

mod engine;
mod registry;

pub use engine::{
    LifecycleEngine, LifecycleError, LifecyclePolicy, LifecycleResult, TransitionOutcome,
    TransitionRequest,
};
pub use registry::{GateRegistry, GateScope};
