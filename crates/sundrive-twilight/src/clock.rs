use chrono::{Local, NaiveDate};

/// Source of "today" for cache freshness.
pub trait Clock: Send + Sync {
    /// Today's calendar date on the local wall clock.
    fn today(&self) -> NaiveDate;
}

/// Local system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
