//! Output module for harvested data and run reporting
//!
//! This module handles:
//! - The consolidated CSV dataset shared by every worker
//! - Raw per-page artifacts for diagnostics
//! - Run counters, the progress line and the final summary

mod csv_sink;
pub mod progress;
mod raw;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use progress::{CounterSnapshot, HarvestCounters, ProgressReporter};
pub use raw::RawArtifactWriter;
pub use stats::{print_dry_run, print_summary, DryRunReport, RunSummary};
pub use traits::{ResultRow, ResultSink, SinkError, SinkResult};
