//! Calendar attributes derived from an hour timestamp.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

const BUSINESS_HOURS: std::ops::Range<u32> = 7..19;
const PEAK_HOURS: std::ops::Range<u32> = 18..22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter = 0,
    Spring = 1,
    Summer = 2,
    Fall = 3,
}

impl Season {
    /// Meteorological seasons: Dec-Feb, Mar-May, Jun-Aug, Sep-Nov.
    pub fn from_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Fields stored on every hourly record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFields {
    pub hour_of_day: u32,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
    pub month: u32,
    pub is_weekend: bool,
}

impl CalendarFields {
    pub fn from_timestamp(ts: NaiveDateTime) -> Self {
        let day_of_week = ts.weekday().num_days_from_monday();
        Self {
            hour_of_day: ts.hour(),
            day_of_week,
            month: ts.month(),
            is_weekend: day_of_week >= 5,
        }
    }
}

pub fn day_of_month(ts: NaiveDateTime) -> u32 {
    ts.day()
}

/// 1-based ordinal day.
pub fn day_of_year(ts: NaiveDateTime) -> u32 {
    ts.ordinal()
}

pub fn iso_week_of_year(ts: NaiveDateTime) -> u32 {
    ts.iso_week().week()
}

pub fn quarter(month: u32) -> u32 {
    (month.saturating_sub(1)) / 3 + 1
}

pub fn is_business_hours(hour_of_day: u32, day_of_week: u32) -> bool {
    BUSINESS_HOURS.contains(&hour_of_day) && day_of_week < 5
}

pub fn is_peak_hours(hour_of_day: u32) -> bool {
    PEAK_HOURS.contains(&hour_of_day)
}
