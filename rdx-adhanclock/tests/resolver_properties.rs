use adhanclock::prelude::*;
use adhanclock::resolver::resolve;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use proptest::prelude::*;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
}

fn label(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// Six distinct minutes of the day in ascending order.
fn timetable_minutes() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::btree_set(0u32..1440, 6).prop_map(|set| set.into_iter().collect())
}

fn build(minutes: &[u32]) -> Timetable {
    Timetable::from_entries(
        PrayerName::ALL
            .iter()
            .zip(minutes)
            .map(|(name, minute)| (name.as_str(), label(*minute))),
    )
    .unwrap()
}

fn at_second(second_of_day: u32) -> DateTime<Tz> {
    let time = NaiveTime::from_num_seconds_from_midnight_opt(second_of_day, 0).unwrap();
    Tz::UTC.from_utc_datetime(&date().and_time(time))
}

proptest! {
    #[test]
    fn before_fajr_the_next_prayer_is_fajr_today(
        minutes in timetable_minutes(),
        offset in 0u32..86_400,
    ) {
        let fajr = minutes[0] * 60;
        prop_assume!(fajr > 0);
        let now = at_second(offset % fajr);
        let next = resolve(&now, &build(&minutes));
        prop_assert_eq!(next.name, PrayerName::Fajr);
        prop_assert_eq!(next.at.date_naive(), date());
    }

    #[test]
    fn after_isha_the_next_prayer_is_fajr_tomorrow(
        minutes in timetable_minutes(),
        offset in 0u32..86_400,
    ) {
        let isha = minutes[5] * 60;
        let now = at_second(isha + offset % (86_400 - isha));
        let next = resolve(&now, &build(&minutes));
        prop_assert_eq!(next.name, PrayerName::Fajr);
        prop_assert_eq!(next.at.date_naive(), date() + Duration::days(1));
        prop_assert_eq!(next.at.hour() * 60 + next.at.minute(), minutes[0]);
    }

    #[test]
    fn a_prayer_at_exactly_now_has_passed(
        minutes in timetable_minutes(),
        index in 0usize..5,
    ) {
        let now = at_second(minutes[index] * 60);
        let next = resolve(&now, &build(&minutes));
        prop_assert_eq!(next.name, PrayerName::ALL[index + 1]);
    }

    #[test]
    fn the_countdown_is_the_exact_gap(
        minutes in timetable_minutes(),
        second in 0u32..86_400,
    ) {
        let now = at_second(second);
        let next = resolve(&now, &build(&minutes));
        let countdown = next.countdown(&now);
        prop_assert!(next.at > now);
        prop_assert_eq!(
            countdown.total_seconds() as i64,
            (next.at - now).num_seconds()
        );
        prop_assert!(countdown.minutes < 60 && countdown.seconds < 60);
    }
}

#[test]
fn tomorrow_reuses_todays_fajr_time() {
    let table = Timetable::from_entries([
        ("Fajr", "04:58"),
        ("Sunrise", "06:14"),
        ("Dhuhr", "12:07"),
        ("Asr", "15:36"),
        ("Maghrib", "17:59"),
        ("Isha", "19:15"),
    ])
    .unwrap();
    let next = resolve(&at_second(23 * 3600 + 59 * 60 + 59), &table);
    assert_eq!(next.name, PrayerName::Fajr);
    assert_eq!(next.at, Tz::UTC.with_ymd_and_hms(2026, 5, 11, 4, 58, 0).unwrap());
    assert_eq!(next.countdown(&at_second(86_399)).to_string(), "4h 58m 1s");
}
