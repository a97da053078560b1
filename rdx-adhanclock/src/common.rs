//! Contains common, primitive types shared by every part of the engine.
//!
//! The prayer names form a closed set. Their declaration order is the
//! canonical chronological order of a day, which both the next-prayer
//! resolver and the trigger check rely on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Index into the configured sound catalogue.
pub type SoundIndex = usize;

/// One of the six daily entries of a timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// Every entry of a timetable, in chronological order.
    pub const ALL: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// The five prayers that sound an alert. Sunrise is informational only.
    pub const ALERT_ELIGIBLE: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    pub fn is_alert_eligible(self) -> bool {
        self != PrayerName::Sunrise
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name one of the six timetable entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a prayer name")]
pub struct UnknownPrayerName(pub String);

impl FromStr for PrayerName {
    type Err = UnknownPrayerName;

    /// Case-insensitive, so "fajr" and "FAJR" are both accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PrayerName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownPrayerName(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_matches_declaration_order() {
        for (slot, name) in PrayerName::ALL.iter().enumerate() {
            assert_eq!(name.slot(), slot);
        }
        let mut sorted = PrayerName::ALL;
        sorted.sort();
        assert_eq!(sorted, PrayerName::ALL);
    }

    #[test]
    fn sunrise_is_the_only_silent_entry() {
        let silent: Vec<_> = PrayerName::ALL
            .into_iter()
            .filter(|name| !name.is_alert_eligible())
            .collect();
        assert_eq!(silent, vec![PrayerName::Sunrise]);
        assert!(!PrayerName::ALERT_ELIGIBLE.contains(&PrayerName::Sunrise));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("maghrib".parse::<PrayerName>(), Ok(PrayerName::Maghrib));
        assert_eq!(" ISHA ".parse::<PrayerName>(), Ok(PrayerName::Isha));
        assert_eq!(
            "Midnight".parse::<PrayerName>(),
            Err(UnknownPrayerName("Midnight".to_string()))
        );
    }
}
