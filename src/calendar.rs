//! Calendar arithmetic in the display timezone
//!
//! Bucket anchors are computed from local wall-clock time so that day, week
//! and month edges fall on local midnight. The per-minute grid used for
//! windowing is anchored to local midnight of the first sample's day and
//! advances in absolute time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::config::BucketWidth;

/// Weekday names indexed Monday = 0 … Sunday = 6
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Resolve a local wall-clock time to an instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// fall in a DST gap move forward to the first valid local time.
pub fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut probe = naive;
    for _ in 0..8 {
        if let Some(instant) = tz.from_local_datetime(&probe).earliest() {
            return instant;
        }
        probe += Duration::minutes(15);
    }
    tz.from_utc_datetime(&naive)
}

/// Local midnight at the start of `date`
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    resolve_local(tz, start_of_day(date))
}

/// `[start, end)` instants of a local calendar day
pub fn day_bounds(tz: &Tz, date: NaiveDate) -> (DateTime<Tz>, DateTime<Tz>) {
    let next = date.succ_opt().unwrap_or(date);
    (local_midnight(tz, date), local_midnight(tz, next))
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Local wall-clock start of the bucket containing `timestamp`
pub fn bucket_start(timestamp: &DateTime<Tz>, width: BucketWidth) -> NaiveDateTime {
    let local = timestamp.naive_local();
    let date = local.date();
    match width {
        BucketWidth::Hour => start_of_day(date) + Duration::hours(i64::from(local.hour())),
        BucketWidth::Day => start_of_day(date),
        BucketWidth::WeekFromSunday => {
            let back = i64::from(date.weekday().num_days_from_sunday());
            start_of_day(date - Duration::days(back))
        }
        BucketWidth::MonthStart => start_of_day(date.with_day(1).unwrap_or(date)),
    }
}

/// Render a bucket start with a strftime-style pattern
pub fn format_label(start: &NaiveDateTime, label_format: &str) -> String {
    start.format(label_format).to_string()
}

/// Local hour of day, 0–23
pub fn local_hour(timestamp: &DateTime<Tz>) -> u32 {
    timestamp.hour()
}

/// Local weekday index, Monday = 0 … Sunday = 6
pub fn weekday_index(timestamp: &DateTime<Tz>) -> u32 {
    timestamp.weekday().num_days_from_monday()
}

/// Name for a Monday-based weekday index
pub fn weekday_name(index: u32) -> &'static str {
    WEEKDAY_NAMES
        .get(index as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Uniform one-minute grid anchored to local midnight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinuteGrid {
    origin: DateTime<Tz>,
}

impl MinuteGrid {
    /// Grid whose slot 0 starts at local midnight of `first`'s day
    pub fn anchored_at(first: &DateTime<Tz>) -> Self {
        let tz = first.timezone();
        Self {
            origin: local_midnight(&tz, first.date_naive()),
        }
    }

    pub fn origin(&self) -> DateTime<Tz> {
        self.origin
    }

    /// Index of the minute containing `timestamp` (negative before origin)
    pub fn slot(&self, timestamp: &DateTime<Tz>) -> i64 {
        (*timestamp - self.origin)
            .num_milliseconds()
            .div_euclid(60_000)
    }

    /// Start instant of a minute slot
    pub fn slot_start(&self, slot: i64) -> DateTime<Tz> {
        self.origin + Duration::minutes(slot)
    }
}
