//! crates/kayak_rental_core/src/reporting/window.rs
//!
//! Turns a coarse reporting period into a concrete `[start, end]` pair.
//!
//! Calendar boundaries are computed in the time zone of the `now` value the
//! caller passes in, so the same instant can yield different windows for
//! different zones. Both bounds are inclusive; `end` always lands on the
//! last millisecond of a local day.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// The period a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Custom {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

/// An inclusive range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Resolves `period` against `now`. Returns `None` when the period does not
/// restrict anything, which only happens for a custom period missing a bound.
pub fn resolve_window<Tz: TimeZone>(period: &Period, now: &DateTime<Tz>) -> Option<Window> {
    let tz = now.timezone();
    let today = now.date_naive();

    let (first, last) = match period {
        Period::Day => (today, today),
        Period::Week => {
            let back = today.weekday().num_days_from_sunday() as i64;
            let sunday = today - Duration::days(back);
            (sunday, sunday + Duration::days(6))
        }
        Period::Month => {
            let first = today.with_day(1).unwrap_or(today);
            let last = first
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(today);
            (first, last)
        }
        Period::Custom { start, end } => {
            let (start, end) = (start.as_ref()?, end.as_ref()?);
            let end_day = end.with_timezone(&tz).date_naive();
            return Some(Window {
                start: *start,
                end: end_of_day(&tz, end_day),
            });
        }
    };

    Some(Window {
        start: start_of_day(&tz, first),
        end: end_of_day(&tz, last),
    })
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(tz, date.and_time(NaiveTime::MIN), true)
}

fn end_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let last_milli = date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1);
    local_to_utc(tz, last_milli, false)
}

// A local time skipped by a DST jump is pushed forward an hour.
fn local_to_utc<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    let pick = |naive: &NaiveDateTime| {
        let candidates = tz.from_local_datetime(naive);
        if earliest {
            candidates.earliest()
        } else {
            candidates.latest()
        }
    };
    pick(&local)
        .or_else(|| pick(&(local + Duration::hours(1))))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn last_milli(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        utc(y, m, d, 23, 59, 59) + Duration::milliseconds(999)
    }

    #[test]
    fn test_day_window() {
        let now = utc(2024, 3, 15, 10, 0, 0);
        let window = resolve_window(&Period::Day, &now).unwrap();
        assert_eq!(window.start, utc(2024, 3, 15, 0, 0, 0));
        assert_eq!(window.end, last_milli(2024, 3, 15));
    }

    #[test]
    fn test_month_window_leap_february() {
        let now = utc(2024, 2, 10, 0, 0, 0);
        let window = resolve_window(&Period::Month, &now).unwrap();
        assert_eq!(window.start, utc(2024, 2, 1, 0, 0, 0));
        assert_eq!(window.end, last_milli(2024, 2, 29));
    }

    #[test]
    fn test_month_window_december_rolls_year() {
        let now = utc(2023, 12, 5, 18, 30, 0);
        let window = resolve_window(&Period::Month, &now).unwrap();
        assert_eq!(window.start, utc(2023, 12, 1, 0, 0, 0));
        assert_eq!(window.end, last_milli(2023, 12, 31));
    }

    #[test]
    fn test_week_window_runs_sunday_to_saturday() {
        // 2024-03-15 is a Friday.
        let now = utc(2024, 3, 15, 10, 0, 0);
        let window = resolve_window(&Period::Week, &now).unwrap();
        assert_eq!(window.start, utc(2024, 3, 10, 0, 0, 0));
        assert_eq!(window.end, last_milli(2024, 3, 16));

        // On a Sunday the week starts that same day.
        let sunday = utc(2024, 3, 10, 8, 0, 0);
        let window = resolve_window(&Period::Week, &sunday).unwrap();
        assert_eq!(window.start, utc(2024, 3, 10, 0, 0, 0));
    }

    #[test]
    fn test_day_window_uses_callers_zone() {
        let zone = FixedOffset::west_opt(3 * 3600).unwrap();
        // 22:00 local on the 15th is already the 16th in UTC.
        let now = zone.with_ymd_and_hms(2024, 3, 15, 22, 0, 0).unwrap();
        let window = resolve_window(&Period::Day, &now).unwrap();
        assert_eq!(window.start, utc(2024, 3, 15, 3, 0, 0));
        assert_eq!(window.end, utc(2024, 3, 16, 2, 59, 59) + Duration::milliseconds(999));
    }

    #[test]
    fn test_custom_window_normalises_end() {
        let now = utc(2024, 3, 15, 10, 0, 0);
        let period = Period::Custom {
            start: Some(utc(2024, 3, 1, 9, 0, 0)),
            end: Some(utc(2024, 3, 20, 8, 0, 0)),
        };
        let window = resolve_window(&period, &now).unwrap();
        assert_eq!(window.start, utc(2024, 3, 1, 9, 0, 0));
        assert_eq!(window.end, last_milli(2024, 3, 20));
    }

    #[test]
    fn test_custom_window_missing_bound_means_no_filter() {
        let now = utc(2024, 3, 15, 10, 0, 0);
        let only_start = Period::Custom {
            start: Some(utc(2024, 3, 1, 0, 0, 0)),
            end: None,
        };
        let only_end = Period::Custom {
            start: None,
            end: Some(utc(2024, 3, 1, 0, 0, 0)),
        };
        assert_eq!(resolve_window(&only_start, &now), None);
        assert_eq!(resolve_window(&only_end, &now), None);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = utc(2024, 3, 15, 10, 0, 0);
        let window = resolve_window(&Period::Day, &now).unwrap();
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + Duration::milliseconds(1)));
        assert!(!window.contains(window.start - Duration::milliseconds(1)));
    }
}
