use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};

/// Source of "now" in server-local wall time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock truncated to milliseconds, the precision of `DATETIME(3)`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(3)
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
