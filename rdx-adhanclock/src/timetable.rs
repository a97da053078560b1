//! One day's prayer times for one location.
//!
//! A `Timetable` is only ever built whole. Construction validates all six
//! entries, so a value of this type is always well-formed and the resolver
//! and trigger check never have to defend against gaps.

use crate::common::PrayerName;
use crate::error::{AdhanError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six prayer times of a single day, indexed by `PrayerName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timetable {
    times: [NaiveTime; 6],
}

impl Timetable {
    /// Builds a timetable from `(name, "HH:MM")` pairs.
    ///
    /// Keys that are not one of the six prayer names (the timings service
    /// also reports Imsak, Sunset, Midnight, ...) are ignored. A value may
    /// carry a trailing annotation such as `"05:17 (EET)"`.
    ///
    /// # Errors
    /// `MalformedTimetable` if any of the six entries is missing or is not a
    /// valid 24-hour time.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut slots: [Option<NaiveTime>; 6] = [None; 6];
        for (key, value) in entries {
            let Ok(name) = key.as_ref().parse::<PrayerName>() else {
                continue;
            };
            let time = parse_time_of_day(value.as_ref()).ok_or_else(|| {
                AdhanError::MalformedTimetable {
                    prayer: name,
                    detail: format!("has an invalid time '{}'", value.as_ref()),
                }
            })?;
            slots[name.slot()] = Some(time);
        }

        let mut times = [NaiveTime::default(); 6];
        for name in PrayerName::ALL {
            times[name.slot()] = slots[name.slot()].ok_or_else(|| AdhanError::MalformedTimetable {
                prayer: name,
                detail: "is missing".to_string(),
            })?;
        }
        Ok(Self { times })
    }

    /// Returns the time of day of a single entry.
    pub fn get(&self, name: PrayerName) -> NaiveTime {
        self.times[name.slot()]
    }

    /// The entry formatted at minute resolution, e.g. `"05:17"`.
    pub fn minute_label(&self, name: PrayerName) -> String {
        self.get(name).format("%H:%M").to_string()
    }

    /// Iterates over all six entries in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (PrayerName, NaiveTime)> + '_ {
        PrayerName::ALL.into_iter().map(|name| (name, self.get(name)))
    }
}

/// Parses the leading `HH:MM` of a timings value.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let token = raw.split_whitespace().next()?;
    NaiveTime::parse_from_str(token, "%H:%M").ok()
}

/// The Hijri calendar date reported alongside a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HijriDate {
    pub day: String,
    pub month_en: String,
    pub month_ar: String,
    pub year: String,
}

impl fmt::Display for HijriDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} AH", self.day, self.month_en, self.year)
    }
}

/// Where a timetable applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
}

impl fmt::Display for LocationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.country.is_empty() {
            f.write_str(&self.city)
        } else {
            write!(f, "{}, {}", self.city, self.country)
        }
    }
}

/// A timetable together with the metadata of the fetch that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTimetable {
    pub timetable: Timetable,
    pub hijri: Option<HijriDate>,
    pub location: Option<LocationInfo>,
}

impl From<Timetable> for DailyTimetable {
    fn from(timetable: Timetable) -> Self {
        Self {
            timetable,
            hijri: None,
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn full_day() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Fajr", "05:00"),
            ("Sunrise", "06:20"),
            ("Dhuhr", "12:15"),
            ("Asr", "15:45"),
            ("Maghrib", "18:30"),
            ("Isha", "20:00"),
        ]
    }

    #[test]
    fn builds_from_complete_entries() {
        let table = Timetable::from_entries(full_day()).unwrap();
        assert_eq!(table.get(PrayerName::Fajr), hm(5, 0));
        assert_eq!(table.get(PrayerName::Asr), hm(15, 45));
        assert_eq!(table.minute_label(PrayerName::Isha), "20:00");
        let names: Vec<_> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, PrayerName::ALL.to_vec());
    }

    #[test]
    fn ignores_extra_keys_and_zone_annotations() {
        let mut entries = full_day();
        entries.push(("Imsak", "04:50"));
        entries.push(("Midnight", "00:12"));
        entries[0] = ("Fajr", "05:00 (EET)");
        let table = Timetable::from_entries(entries).unwrap();
        assert_eq!(table.get(PrayerName::Fajr), hm(5, 0));
    }

    #[test]
    fn rejects_a_missing_entry() {
        let entries: Vec<_> = full_day()
            .into_iter()
            .filter(|(name, _)| *name != "Maghrib")
            .collect();
        match Timetable::from_entries(entries) {
            Err(AdhanError::MalformedTimetable { prayer, .. }) => {
                assert_eq!(prayer, PrayerName::Maghrib)
            }
            other => panic!("expected MalformedTimetable, got {other:?}"),
        }
    }

    #[test]
    fn rejects_an_invalid_time() {
        let mut entries = full_day();
        entries[2] = ("Dhuhr", "25:61");
        assert!(matches!(
            Timetable::from_entries(entries),
            Err(AdhanError::MalformedTimetable {
                prayer: PrayerName::Dhuhr,
                ..
            })
        ));
    }

    #[test]
    fn parses_leading_time_only() {
        assert_eq!(parse_time_of_day("04:05"), Some(hm(4, 5)));
        assert_eq!(parse_time_of_day(" 23:59 (+03)"), Some(hm(23, 59)));
        assert_eq!(parse_time_of_day(""), None);
        assert_eq!(parse_time_of_day("noon"), None);
    }

    #[test]
    fn hijri_date_displays_like_the_dashboard() {
        let hijri = HijriDate {
            day: "14".into(),
            month_en: "Ramaḍān".into(),
            month_ar: "رَمَضان".into(),
            year: "1447".into(),
        };
        assert_eq!(hijri.to_string(), "14 Ramaḍān 1447 AH");
    }
}
