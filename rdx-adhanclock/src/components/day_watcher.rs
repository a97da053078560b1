//! Watches the tick stream for calendar milestones.

use crate::events::DayEvent;
use crate::time::TickEvent;
use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::info;

/// Fires `DayEvent::DateChanged` when the local date of the ticks rolls over.
///
/// A timetable is only valid for one day, so hosts use this to refetch.
#[doc(hidden)]
#[derive(Debug, Default)]
pub(crate) struct DayWatcher {
    last_known_date: Option<NaiveDate>,
}

impl DayWatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Processes a tick. The first tick only records the date.
    /// Returns `true` if a `DateChanged` event was sent.
    pub(crate) fn process_tick(
        &mut self,
        tick: &TickEvent,
        day_event_sender: &broadcast::Sender<DayEvent>,
    ) -> bool {
        let current_date = tick.timestamp.date_naive();
        match self.last_known_date.replace(current_date) {
            Some(previous) if previous != current_date => {
                info!(%previous, %current_date, "Date changed.");
                day_event_sender
                    .send(DayEvent::DateChanged {
                        new_date: current_date,
                    })
                    .ok();
                true
            }
            _ => false,
        }
    }
}
