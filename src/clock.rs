//! Manually driven clock for deterministic scheduling.
//!
//! Services take any [`mockable::Clock`]. Production code passes
//! [`mockable::DefaultClock`]; tests and simulations pass a [`ManualClock`]
//! and move time forward explicitly. Every move is published to
//! subscribers, so deadline watchers fire on simulated time without
//! sleeping.

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::watch;

/// Clock whose time only changes when told to.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<watch::Sender<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(watch::Sender::new(start)),
        }
    }

    /// Moves the clock forward by `delta` and notifies subscribers.
    pub fn advance(&self, delta: TimeDelta) {
        self.now.send_modify(|now| *now += delta);
    }

    /// Sets the clock to `instant` and notifies subscribers.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.now.send_replace(instant);
    }

    /// Returns a receiver that wakes whenever the clock moves.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DateTime<Utc>> {
        self.now.subscribe()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.borrow()
    }
}
