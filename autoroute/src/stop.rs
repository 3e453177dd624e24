//! Cooperative cancellation and wall-time budgets.
//!
//! The router has exactly two kinds of suspension points: the per-N-iteration
//! check inside the maze-search loop and the per-connection check in the
//! batch loop. Both consult a [`Stoppable`] and a [`TimeLimit`]; on either
//! firing, the engine returns its current partial state without further
//! mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of external stop requests.
pub trait Stoppable {
    /// Returns `true` once a stop has been requested. Must be cheap; it is
    /// polled from inner loops.
    fn is_stop_requested(&self) -> bool;
}

/// A [`Stoppable`] that never requests a stop.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverStop;

impl Stoppable for NeverStop {
    fn is_stop_requested(&self) -> bool {
        false
    }
}

/// A shareable atomic stop flag.
///
/// Clones share the same underlying flag, so a controller thread can hold one
/// clone and the routing thread another.
#[derive(Debug, Default, Clone)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Observed no later than the next check-point.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl Stoppable for StopFlag {
    fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A monotonic wall-time budget.
#[derive(Debug, Clone)]
pub struct TimeLimit {
    deadline: Option<Instant>,
}

impl TimeLimit {
    /// A budget of `limit` from now; `None` means unlimited.
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            deadline: limit.map(|d| Instant::now() + d),
        }
    }

    /// An unlimited budget.
    pub fn unlimited() -> Self {
        Self { deadline: None }
    }

    /// Returns `true` once the budget has elapsed.
    pub fn is_exceeded(&self) -> bool {
        match self.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_is_shared() {
        let a = StopFlag::new();
        let b = a.clone();
        assert!(!b.is_stop_requested());
        a.request_stop();
        assert!(b.is_stop_requested());
    }

    #[test]
    fn zero_budget_is_immediately_exceeded() {
        let t = TimeLimit::new(Some(Duration::ZERO));
        assert!(t.is_exceeded());
        assert!(!TimeLimit::unlimited().is_exceeded());
    }
}
