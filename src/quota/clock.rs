//! Calendar-day sources for quota rollover.

use chrono::{Days, Local, NaiveDate};
use std::sync::Mutex;

/// Source of the current calendar day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock calendar day.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock for tests and rollover simulations.
#[derive(Debug)]
pub struct ManualClock {
    day: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Mutex::new(day),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        *self.day.lock().unwrap_or_else(|e| e.into_inner()) = day;
    }

    /// Move forward by `days` calendar days.
    pub fn advance_days(&self, days: u64) {
        let mut day = self.day.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = day.checked_add_days(Days::new(days)) {
            *day = next;
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap_or_else(|e| e.into_inner())
    }
}
