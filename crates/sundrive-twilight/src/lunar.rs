//! Rough lunar phase from the mean synodic month. Diagnostic only: the
//! refresh flow logs it, it is never sent to the watch.

use chrono::{DateTime, TimeZone};

/// Mean synodic month in days
pub const LUNAR_MONTH: f64 = 29.530588853;

/// Julian date of a known new moon (2000-01-06)
const NEW_MOON_EPOCH: f64 = 2451550.1;

const UNIX_EPOCH_JD: f64 = 2440587.5;
const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LunarPhase {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl LunarPhase {
    /// Phase for a lunar age in days (0 = new moon).
    pub fn from_age(age: f64) -> Self {
        match age {
            a if a < 1.84566 => Self::New,
            a if a < 5.53699 => Self::WaxingCrescent,
            a if a < 9.22831 => Self::FirstQuarter,
            a if a < 12.91963 => Self::WaxingGibbous,
            a if a < 16.61096 => Self::Full,
            a if a < 20.30228 => Self::WaningGibbous,
            a if a < 23.99361 => Self::LastQuarter,
            a if a < 27.68493 => Self::WaningCrescent,
            _ => Self::New,
        }
    }

    pub fn at<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        Self::from_age(lunar_age(time))
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::WaxingCrescent => "WXC",
            Self::FirstQuarter => "FQ",
            Self::WaxingGibbous => "WXG",
            Self::Full => "FUL",
            Self::WaningGibbous => "WNG",
            Self::LastQuarter => "LQ",
            Self::WaningCrescent => "WNC",
        }
    }
}

/// Julian date of the wall-clock reading of `time` (local offset applied).
pub fn julian_date<Tz: TimeZone>(time: &DateTime<Tz>) -> f64 {
    let offset_secs = time.fixed_offset().offset().local_minus_utc();
    let ms = time.timestamp_millis() as f64 + f64::from(offset_secs) * 1000.0;
    ms / MS_PER_DAY + UNIX_EPOCH_JD
}

/// Days since the last new moon, in `[0, LUNAR_MONTH)`.
pub fn lunar_age<Tz: TimeZone>(time: &DateTime<Tz>) -> f64 {
    let cycles = (julian_date(time) - NEW_MOON_EPOCH) / LUNAR_MONTH;
    cycles.rem_euclid(1.0) * LUNAR_MONTH
}
