//! Delegation services.

mod coordinator;
mod watcher;

pub use coordinator::{
    Advancement, DelegateRequest, DelegationCoordinator, DelegationEvents, ReportReceipt,
};
