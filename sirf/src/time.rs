//! GPS week/time-of-week handling.

use core::fmt;

use chrono::{DateTime, Utc};

/// Unix time of the GPS epoch, 1980-01-06T00:00:00Z.
pub const GPS_EPOCH: i64 = 315_964_800;
pub const SECS_PER_WEEK: i64 = 604_800;
/// GPS-UTC offset in force since 2017-01-01.
pub const GPS_LEAP_SECONDS: i64 = 18;

const HUNDREDTHS_PER_DAY: i32 = 8_640_000;
const HUNDREDTHS_PER_HOUR: i32 = 360_000;
const HUNDREDTHS_PER_MINUTE: i32 = 6_000;

/// A receiver timestamp: GPS week plus time of week in hundredths of a
/// second, as carried by navigation, tracking and clock messages.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GpsTime {
    pub week: u16,
    pub tow: i32,
}

/// Time of week broken into day and time of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekDay {
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: f64,
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}:{:05.2}",
            self.day, self.hour, self.minute, self.second
        )
    }
}

impl GpsTime {
    pub fn new(week: u16, tow: i32) -> Self {
        Self { week, tow }
    }

    /// Time of week in seconds.
    pub fn tow_seconds(&self) -> f64 {
        f64::from(self.tow) / 100.0
    }

    pub fn week_day(&self) -> WeekDay {
        let day = self.tow / HUNDREDTHS_PER_DAY;
        let tod = self.tow % HUNDREDTHS_PER_DAY;
        let hour = tod / HUNDREDTHS_PER_HOUR;
        let rest = tod % HUNDREDTHS_PER_HOUR;
        let hundredths = rest % HUNDREDTHS_PER_MINUTE;
        WeekDay {
            day,
            hour,
            minute: (rest - hundredths) / HUNDREDTHS_PER_MINUTE,
            second: f64::from(hundredths) / 100.0,
        }
    }

    /// Seconds since the Unix epoch, UTC.
    pub fn to_unix(&self) -> f64 {
        let whole = GPS_EPOCH + i64::from(self.week) * SECS_PER_WEEK - GPS_LEAP_SECONDS;
        whole as f64 + self.tow_seconds()
    }

    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let unix = self.to_unix();
        let secs = unix.floor();
        let nanos = ((unix - secs) * 1e9).round() as u32;
        DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
    }

    /// `now` minus the receiver clock, in seconds.
    pub fn skew(&self, now: DateTime<Utc>) -> f64 {
        let now = now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6;
        now - self.to_unix()
    }
}

impl fmt::Display for GpsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4}+{:9.2}", self.week, self.tow_seconds())
    }
}
