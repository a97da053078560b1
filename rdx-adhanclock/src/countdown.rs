//! Decomposes a number of seconds into an `Xh Ym Zs` display.

use chrono::{DateTime, TimeZone};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    /// Plain integer division, no rounding.
    pub fn from_seconds(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    /// Whole seconds from `now` until `target`, clamped at zero when tick
    /// jitter puts `target` in the past.
    pub fn until<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Self {
        let remaining = target.clone().signed_duration_since(now.clone()).num_seconds();
        Self::from_seconds(remaining.max(0) as u64)
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}
