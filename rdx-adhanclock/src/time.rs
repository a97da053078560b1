//! The clock tick source.
//!
//! `SystemClock` is the single source of time for the engine. It reads the
//! wall clock exactly once per tick and ships that reading inside the
//! `TickEvent`, so every decision made for a tick sees the same `now`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// One heartbeat of the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvent {
    /// Ticks since the clock started, starting at 1.
    pub tick_count: u64,
    /// The frozen clock reading for this tick, in the configured zone.
    pub timestamp: DateTime<Tz>,
}

/// Reads the wall clock in `tz`.
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// A periodic ticker that broadcasts `TickEvent`s until told to stop.
pub struct SystemClock {
    interval: Duration,
    timezone: Tz,
    sender: broadcast::Sender<Arc<TickEvent>>,
}

impl SystemClock {
    pub fn new(interval: Duration, timezone: Tz, sender: broadcast::Sender<Arc<TickEvent>>) -> Self {
        Self {
            interval,
            timezone,
            sender,
        }
    }

    /// Ticks until a shutdown signal arrives. The interval timer is dropped
    /// with the task.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        // A stalled runtime should not replay a burst of stale seconds.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick_count: u64 = 0;
        debug!(interval = ?self.interval, "SystemClock started.");
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    tick_count += 1;
                    let tick = TickEvent {
                        tick_count,
                        timestamp: now_in(self.timezone),
                    };
                    trace!(tick_count, "Tick.");
                    self.sender.send(Arc::new(tick)).ok();
                }
            }
        }
        debug!(tick_count, "SystemClock stopped.");
    }
}
