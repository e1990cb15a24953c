use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use dailynotes_types::DATE_FORMAT;

/// The calendar day before `now`, as seen in `timezone`, formatted `YYYY-MM-DD`.
pub fn target_date(now: DateTime<Utc>, timezone: Tz) -> String {
    let today = now.with_timezone(&timezone).date_naive();
    today.pred_opt().unwrap_or(today).format(DATE_FORMAT).to_string()
}

/// A fixed wall-clock time, once per calendar day, in a fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub time: NaiveTime,
    pub timezone: Tz,
}

impl DailySchedule {
    pub fn new(time: NaiveTime, timezone: Tz) -> Self {
        Self { time, timezone }
    }

    /// First firing strictly after `now`, or `None` once the calendar runs out.
    ///
    /// A time skipped by a DST jump fires one hour later that day; a time
    /// repeated by a DST fold fires on its first occurrence.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut day = now.with_timezone(&self.timezone).date_naive();
        loop {
            if let Some(fire) = self.fire_on(day) {
                if fire > now {
                    return Some(fire);
                }
            }
            day = day.succ_opt()?;
        }
    }

    fn fire_on(&self, day: NaiveDate) -> Option<DateTime<Utc>> {
        let local = day.and_time(self.time);
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map(|fire| fire.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn eight_am_new_york() -> DailySchedule {
        DailySchedule::new(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), New_York)
    }

    #[test]
    fn target_date_is_previous_local_day() {
        // 08:00 EDT
        let now = New_York
            .with_ymd_and_hms(2024, 3, 15, 8, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(target_date(now, New_York), "2024-03-14");
    }

    #[test]
    fn target_date_uses_configured_zone_not_utc() {
        // Already the 15th in UTC, still the 14th in New York.
        let now = utc("2024-03-15T02:00:00Z");
        assert_eq!(target_date(now, New_York), "2024-03-13");
        assert_eq!(target_date(now, chrono_tz::UTC), "2024-03-14");
    }

    #[test]
    fn target_date_crosses_month_and_year() {
        assert_eq!(target_date(utc("2024-03-01T12:00:00Z"), chrono_tz::UTC), "2024-02-29");
        assert_eq!(target_date(utc("2025-01-01T12:00:00Z"), chrono_tz::UTC), "2024-12-31");
    }

    #[test]
    fn next_after_same_day_when_before_fire_time() {
        let next = eight_am_new_york().next_after(utc("2024-03-15T11:00:00Z")).unwrap();
        assert_eq!(next, utc("2024-03-15T12:00:00Z"));
    }

    #[test]
    fn next_after_is_strictly_later() {
        let next = eight_am_new_york().next_after(utc("2024-03-15T12:00:00Z")).unwrap();
        assert_eq!(next, utc("2024-03-16T12:00:00Z"));
    }

    #[test]
    fn next_after_tracks_utc_offset_change() {
        // EST on the 9th, EDT from the 10th.
        let next = eight_am_new_york().next_after(utc("2024-03-09T14:00:00Z")).unwrap();
        assert_eq!(next, utc("2024-03-10T12:00:00Z"));
    }

    #[test]
    fn skipped_time_rolls_forward_an_hour() {
        let schedule = DailySchedule::new(NaiveTime::from_hms_opt(2, 30, 0).unwrap(), New_York);
        let next = schedule.next_after(utc("2024-03-10T05:00:00Z")).unwrap();
        // 03:30 EDT
        assert_eq!(next, utc("2024-03-10T07:30:00Z"));
    }

    #[test]
    fn no_firing_past_the_last_representable_day() {
        let schedule = DailySchedule::new(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), chrono_tz::UTC);
        assert_eq!(schedule.next_after(DateTime::<Utc>::MAX_UTC), None);
    }

    #[test]
    fn repeated_time_fires_once_on_first_occurrence() {
        let schedule = DailySchedule::new(NaiveTime::from_hms_opt(1, 30, 0).unwrap(), New_York);
        let first = schedule.next_after(utc("2024-11-03T04:00:00Z")).unwrap();
        // 01:30 EDT
        assert_eq!(first, utc("2024-11-03T05:30:00Z"));
        let second = schedule.next_after(first).unwrap();
        assert_eq!(second, utc("2024-11-04T06:30:00Z"));
    }
}
