//! Run summaries
//!
//! This module turns the final counters of a run into a summary and prints
//! it, along with the plan shown by a dry run.

use crate::output::progress::CounterSnapshot;
use std::time::Duration;

/// Final tally of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Units enumerated for this run (after deduplication)
    pub total: u64,

    /// Units that reached end of unit
    pub succeeded: u64,

    /// Units that gave up; resumable by a later run
    pub failed: u64,

    /// Units already complete in the checkpoint
    pub skipped: u64,

    /// Units stopped by the page limit
    pub capped: u64,

    /// Units interrupted or never dispatched because the run stopped early
    pub cancelled: u64,

    /// Rows appended to the dataset
    pub rows: u64,

    /// Pages fetched successfully
    pub pages: u64,

    /// Highest number of units running at once
    pub peak_concurrency: u64,

    pub elapsed: Duration,

    /// Set when a shared I/O failure ended the run early
    pub aborted: Option<String>,
}

impl RunSummary {
    /// Builds a summary from a counter snapshot
    pub fn from_snapshot(total: u64, snapshot: &CounterSnapshot, elapsed: Duration) -> Self {
        Self {
            total,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            skipped: snapshot.skipped,
            capped: snapshot.capped,
            cancelled: snapshot.cancelled,
            rows: snapshot.rows_written,
            pages: snapshot.pages_fetched,
            peak_concurrency: snapshot.peak_active,
            elapsed,
            aborted: None,
        }
    }

    /// Units processed per second, skipped ones excluded
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total - self.skipped.min(self.total)) as f64 / secs
        } else {
            0.0
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// What a run would dispatch, computed without any network I/O
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DryRunReport {
    pub total: usize,

    /// Units absent from the checkpoint (start at page 0)
    pub fresh: usize,

    /// Units with a recorded cursor
    pub resumable: usize,

    /// Units marked done; never dispatched
    pub complete: usize,

    /// Units rejected by the source loader
    pub invalid: usize,

    /// Duplicate units collapsed by the source loader
    pub duplicates: usize,
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Units:");
    println!("  Total: {}", summary.total);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped (already complete): {}", summary.skipped);
    if summary.capped > 0 {
        println!("  Stopped at page limit: {}", summary.capped);
    }
    if summary.cancelled > 0 {
        println!("  Cancelled: {}", summary.cancelled);
    }
    println!();

    println!("Output:");
    println!("  Pages fetched: {}", summary.pages);
    println!("  Rows written: {}", summary.rows);
    println!("  Peak concurrency: {}", summary.peak_concurrency);
    println!();

    let secs = summary.elapsed.as_secs();
    println!(
        "Elapsed: {}m {}s ({:.2} units/s)",
        secs / 60,
        secs % 60,
        summary.throughput()
    );

    if let Some(reason) = &summary.aborted {
        println!();
        println!("Run aborted: {}", reason);
    } else if summary.failed + summary.cancelled > 0 {
        println!(
            "{} units left resumable; re-run to continue",
            summary.failed + summary.cancelled
        );
    }
}

/// Prints a dry-run plan to stdout
pub fn print_dry_run(report: &DryRunReport) {
    println!("=== Dry Run ===\n");
    println!("Units loaded: {}", report.total);
    if report.invalid > 0 || report.duplicates > 0 {
        println!(
            "  ({} invalid rows skipped, {} duplicates collapsed)",
            report.invalid, report.duplicates
        );
    }
    println!("  Fresh (page 0): {}", report.fresh);
    println!("  Resumable: {}", report.resumable);
    println!("  Complete (skipped): {}", report.complete);
    println!();
    println!(
        "Would dispatch {} units",
        report.fresh + report.resumable
    );
}
