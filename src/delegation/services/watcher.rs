//! Background expiry of overdue delegations.
//!
//! Two drivers are offered: a wall-clock period for production ledgers, and
//! a subscription to a [`crate::clock::ManualClock`] that sweeps every time
//! simulated time moves.

use super::DelegationCoordinator;
use crate::delegation::ports::DelegationRepository;
use crate::store::ports::RecordRepository;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

const MIN_PERIOD: Duration = Duration::from_millis(1);

impl<R, D, C> DelegationCoordinator<R, D, C>
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Spawns a task that calls [`Self::expire_overdue`] every `period`.
    ///
    /// Deadlines are still judged by the coordinator's clock; the period only
    /// controls how often they are checked. The task holds the coordinator
    /// weakly and stops once it is dropped, or when the returned handle is
    /// aborted.
    #[must_use = "dropping the handle detaches the watcher"]
    pub fn spawn_timeout_watcher(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let coordinator = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !sweep(&coordinator).await {
                    break;
                }
            }
        })
    }

    /// Spawns a task that calls [`Self::expire_overdue`] whenever the clock
    /// behind `moves` changes.
    ///
    /// Stops when the coordinator or the clock is dropped, or when the
    /// returned handle is aborted.
    #[must_use = "dropping the handle detaches the watcher"]
    pub fn spawn_clock_watcher(
        self: &Arc<Self>,
        mut moves: watch::Receiver<DateTime<Utc>>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::downgrade(self);
        tokio::spawn(async move {
            while moves.changed().await.is_ok() {
                if !sweep(&coordinator).await {
                    return;
                }
            }
            debug!("clock dropped; timeout watcher stopping");
        })
    }
}

/// Expires overdue work once. Returns `false` when the coordinator is gone.
async fn sweep<R, D, C>(coordinator: &Weak<DelegationCoordinator<R, D, C>>) -> bool
where
    R: RecordRepository + 'static,
    D: DelegationRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Some(live) = coordinator.upgrade() else {
        debug!("coordinator dropped; timeout watcher stopping");
        return false;
    };
    match live.expire_overdue().await {
        Ok(expired) if !expired.is_empty() => {
            debug!(expired = expired.len(), "timeout watcher expired delegations");
        }
        Ok(_) => {}
        Err(err) => error!(error = %err, "timeout watcher failed to expire delegations"),
    }
    true
}
