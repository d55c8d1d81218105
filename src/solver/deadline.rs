//! Cooperative time budget.

use std::time::{Duration, Instant};

/// A point in time after which stage loops stop early.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Expires `budget` from now. A budget past the clock's range never expires.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(budget),
        }
    }

    /// Expires after `seconds`. Zero, or more than a `Duration` can hold,
    /// means no limit.
    pub fn from_seconds(seconds: f64) -> Self {
        if !(seconds > 0.0 && seconds.is_finite()) {
            return Self::never();
        }
        match Duration::try_from_secs_f64(seconds) {
            Ok(budget) => Self::after(budget),
            Err(_) => Self::never(),
        }
    }

    /// Never expires.
    pub fn never() -> Self {
        Self { at: None }
    }

    /// Whether the budget is spent.
    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, `None` when unlimited.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}
