//! Dispatch telemetry.
//!
//! Lock-free atomic counters updated by the dispatcher as tasks are
//! submitted and harvested.
//!
//! ```text
//! Dispatcher ─────► DispatchMetrics ─────► DispatchSnapshot
//!                   (atomic counters)      (point-in-time copy)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing a dispatch run.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    submitted: AtomicU64,
    completed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task handed to the worker pool.
    pub fn task_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::Relaxed);
    }

    /// Record a harvested task.
    pub fn task_completed(&self, success: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
}

impl DispatchSnapshot {
    /// Tasks submitted but not yet harvested.
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.completed)
    }
}
