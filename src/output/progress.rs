//! Run counters and the progress line
//!
//! Workers bump atomic counters; the reporter only ever reads a relaxed
//! snapshot of them, so display never contends with the write path.

use crate::state::UnitOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const BAR_WIDTH: usize = 30;

/// Shared counters updated by the scheduler and the walkers
#[derive(Debug, Default)]
pub struct HarvestCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    capped: AtomicU64,
    cancelled: AtomicU64,
    active: AtomicU64,
    peak_active: AtomicU64,
    rows_written: AtomicU64,
    pages_fetched: AtomicU64,
}

/// Point-in-time copy of [`HarvestCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub capped: u64,
    pub cancelled: u64,
    pub active: u64,
    pub peak_active: u64,
    pub rows_written: u64,
    pub pages_fetched: u64,
}

impl CounterSnapshot {
    /// Units that reached a terminal outcome
    pub fn done(&self) -> u64 {
        self.succeeded + self.failed + self.skipped + self.capped + self.cancelled
    }
}

impl HarvestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a unit as running and tracks the concurrency peak
    pub fn unit_started(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
    }

    pub fn unit_finished(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Counts a terminal outcome
    pub fn record_outcome(&self, outcome: &UnitOutcome) {
        let counter = match outcome {
            UnitOutcome::Completed { .. } => &self.succeeded,
            UnitOutcome::PageLimit { .. } => &self.capped,
            UnitOutcome::Failed { .. } => &self.failed,
            UnitOutcome::Skipped => &self.skipped,
            UnitOutcome::Cancelled { .. } => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a unit that ended in an error rather than an outcome
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts units that were queued but never dispatched
    pub fn record_undispatched(&self, count: u64) {
        self.cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_rows(&self, rows: u64) {
        self.rows_written.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn add_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            capped: self.capped.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            peak_active: self.peak_active.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
        }
    }
}

/// Renders the progress line
pub struct ProgressReporter;

impl ProgressReporter {
    /// Formats `[####----] 42.0% | 21/50 units | 1.23 units/s | ETA 0m 23s`
    ///
    /// Pure function of its inputs. A zero total counts as fully done; a zero
    /// rate gives a zero ETA.
    pub fn report(done: u64, total: u64, elapsed: Duration) -> String {
        let done = done.min(total);
        let fraction = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };

        let filled = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));

        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { done as f64 / secs } else { 0.0 };
        let eta = if rate > 0.0 {
            ((total - done) as f64 / rate) as u64
        } else {
            0
        };

        format!(
            "[{}] {:.1}% | {}/{} units | {:.2} units/s | ETA {}m {}s",
            bar,
            fraction * 100.0,
            done,
            total,
            rate,
            eta / 60,
            eta % 60
        )
    }
}
