//! The edge-triggered alert check.
//!
//! A prayer "matches" for the whole minute its `HH:MM` label equals the
//! clock's `HH:MM` label, i.e. for up to sixty one-second ticks. Trigger
//! memory records the last minute an alert fired so that only the first of
//! those ticks fires.

use crate::common::PrayerName;
use crate::timetable::Timetable;
use chrono::DateTime;
use chrono_tz::Tz;

/// The conditions outside the deduplicator that must all hold for a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FiringGate {
    pub alerts_enabled: bool,
    pub signed_in: bool,
    pub alerting: bool,
    pub previewing: bool,
}

impl FiringGate {
    pub fn is_open(&self) -> bool {
        self.alerts_enabled && self.signed_in && !self.alerting && !self.previewing
    }
}

#[derive(Debug, Clone, Default)]
pub struct TriggerDeduplicator {
    last_fired: Option<String>,
}

impl TriggerDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The minute label of the last fire, if any.
    ///
    /// Only `HH:MM` is kept, not the date: if no alert fires in between, a
    /// prayer on a later day at that same minute is suppressed too.
    pub fn last_fired(&self) -> Option<&str> {
        self.last_fired.as_deref()
    }

    /// Decides whether this tick fires an alert.
    ///
    /// Returns the prayer to sound, having already recorded the minute in
    /// trigger memory. When several prayers share the minute, the first one
    /// in canonical order wins.
    pub fn check(
        &mut self,
        now: &DateTime<Tz>,
        timetable: &Timetable,
        gate: FiringGate,
    ) -> Option<PrayerName> {
        if !gate.is_open() {
            return None;
        }
        let minute = minute_label(now);
        if self.last_fired.as_deref() == Some(minute.as_str()) {
            return None;
        }
        let prayer = PrayerName::ALERT_ELIGIBLE
            .into_iter()
            .find(|name| timetable.minute_label(*name) == minute)?;
        self.last_fired = Some(minute);
        Some(prayer)
    }
}

/// The clock reading at minute resolution, 24-hour, e.g. `"05:17"`.
pub fn minute_label(now: &DateTime<Tz>) -> String {
    now.format("%H:%M").to_string()
}
