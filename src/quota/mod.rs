//! Daily quota tracker with a circuit breaker.
//!
//! The tracker counts granted outbound model calls for the current calendar
//! day. Once the count reaches the configured limit every further
//! [`QuotaTracker::try_reserve`] is refused, without counting, until the day
//! rolls over. All reads and updates happen under one mutex, so concurrent
//! sessions can never push the count past the limit.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::config::QuotaConfig;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub granted: bool,
    pub remaining: u32,
}

/// UI status band for the remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaHealth {
    Healthy,
    Warning,
    Critical,
}

impl QuotaHealth {
    /// Classify `remaining` out of `limit` using percentage thresholds.
    ///
    /// ```
    /// use helpdesk::quota::QuotaHealth;
    ///
    /// assert_eq!(QuotaHealth::classify(21, 50, 40, 20), QuotaHealth::Healthy);
    /// assert_eq!(QuotaHealth::classify(20, 50, 40, 20), QuotaHealth::Warning);
    /// assert_eq!(QuotaHealth::classify(10, 50, 40, 20), QuotaHealth::Warning);
    /// assert_eq!(QuotaHealth::classify(9, 50, 40, 20), QuotaHealth::Critical);
    /// ```
    pub fn classify(remaining: u32, limit: u32, warning_percent: u8, critical_percent: u8) -> Self {
        let remaining = u64::from(remaining) * 100;
        let limit = u64::from(limit);
        if remaining > limit * u64::from(warning_percent) {
            QuotaHealth::Healthy
        } else if remaining >= limit * u64::from(critical_percent) {
            QuotaHealth::Warning
        } else {
            QuotaHealth::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaHealth::Healthy => "healthy",
            QuotaHealth::Warning => "warning",
            QuotaHealth::Critical => "critical",
        }
    }
}

impl std::fmt::Display for QuotaHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the quota for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub day: NaiveDate,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub health: QuotaHealth,
}

#[derive(Debug)]
struct QuotaState {
    date: NaiveDate,
    count: u32,
}

/// Process-wide counter of outbound model calls made today.
pub struct QuotaTracker {
    config: QuotaConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    /// Tracker on the local wall clock.
    pub fn new(config: QuotaConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: QuotaConfig, clock: Arc<dyn Clock>) -> Self {
        let date = clock.today();
        Self {
            config,
            clock,
            state: Mutex::new(QuotaState { date, count: 0 }),
        }
    }

    pub fn limit(&self) -> u32 {
        self.config.daily_limit
    }

    /// Reserve one outbound call.
    ///
    /// Resets the count first when the calendar day changed. Refuses, and
    /// leaves the count unchanged, once the limit is reached.
    pub fn try_reserve(&self) -> Reservation {
        let mut state = self.rolled_over();
        let limit = self.config.daily_limit;
        if state.count >= limit {
            tracing::debug!(used = state.count, limit, "quota reservation refused");
            return Reservation {
                granted: false,
                remaining: 0,
            };
        }
        state.count += 1;
        Reservation {
            granted: true,
            remaining: limit - state.count,
        }
    }

    /// Remaining budget for today. Does not mutate the tracker.
    pub fn remaining(&self) -> u32 {
        let today = self.clock.today();
        let state = self.lock();
        if state.date != today {
            return self.config.daily_limit;
        }
        self.config.daily_limit.saturating_sub(state.count)
    }

    /// Calls granted so far today.
    pub fn used(&self) -> u32 {
        self.config.daily_limit - self.remaining()
    }

    /// Apply any pending day rollover and return the active day.
    pub fn current_day(&self) -> NaiveDate {
        self.rolled_over().date
    }

    /// Exhaust today's budget.
    ///
    /// Used when the provider itself reports rate limiting: the local
    /// breaker then stays open until the next calendar day.
    pub fn trip(&self) {
        let mut state = self.rolled_over();
        if state.count < self.config.daily_limit {
            tracing::warn!(
                used = state.count,
                limit = self.config.daily_limit,
                "quota breaker tripped by provider"
            );
            state.count = self.config.daily_limit;
        }
    }

    pub fn health(&self) -> QuotaHealth {
        QuotaHealth::classify(
            self.remaining(),
            self.config.daily_limit,
            self.config.warning_percent,
            self.config.critical_percent,
        )
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        let state = self.rolled_over();
        let limit = self.config.daily_limit;
        let remaining = limit.saturating_sub(state.count);
        QuotaSnapshot {
            day: state.date,
            used: state.count,
            limit,
            remaining,
            health: QuotaHealth::classify(
                remaining,
                limit,
                self.config.warning_percent,
                self.config.critical_percent,
            ),
        }
    }

    fn rolled_over(&self) -> MutexGuard<'_, QuotaState> {
        let today = self.clock.today();
        let mut state = self.lock();
        if state.date != today {
            tracing::info!(
                previous_day = %state.date,
                day = %today,
                used = state.count,
                "quota day rollover"
            );
            state.date = today;
            state.count = 0;
        }
        state
    }

    fn lock(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("limit", &self.config.daily_limit)
            .field("state", &*self.lock())
            .finish()
    }
}
