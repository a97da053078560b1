//! Works out which prayer comes next.
//!
//! `resolve` is a pure function of the clock reading and the timetable. It
//! returns the first entry of today whose instant is strictly later than
//! `now`; a prayer whose instant equals `now` has already passed. When every
//! entry of today has passed, it rolls over to Fajr tomorrow, reusing today's
//! Fajr time of day.

use crate::common::PrayerName;
use crate::countdown::Countdown;
use crate::timetable::Timetable;
use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// The next prayer and the absolute instant at which it falls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPrayer {
    pub name: PrayerName,
    pub at: DateTime<Tz>,
}

impl NextPrayer {
    /// Time left until this prayer, seen from `now`.
    pub fn countdown(&self, now: &DateTime<Tz>) -> Countdown {
        Countdown::until(now, &self.at)
    }
}

/// Resolves the next prayer after `now`.
pub fn resolve(now: &DateTime<Tz>, timetable: &Timetable) -> NextPrayer {
    let tz = now.timezone();
    let today = now.date_naive();

    for (name, time) in timetable.iter() {
        let at = local_instant(&tz, today, time);
        if at > *now {
            return NextPrayer { name, at };
        }
    }

    let tomorrow = today.succ_opt().unwrap_or(today);
    NextPrayer {
        name: PrayerName::Fajr,
        at: local_instant(&tz, tomorrow, timetable.get(PrayerName::Fajr)),
    }
}

/// Places a wall-clock time on a date in `tz`.
///
/// An ambiguous time (clocks going back) takes the earlier instant. A time
/// that falls into a spring-forward gap is pushed past the gap.
pub(crate) fn local_instant(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => at,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}
