//! Harvest coordinator - run orchestration
//!
//! This module wires one run together:
//! - Loading the units of work for the configured input kind
//! - Opening the checkpoint and the dataset
//! - Building the HTTP stack and the walker
//! - Running the scheduler with a periodic progress line
//! - Clearing the checkpoint once every unit is complete

use crate::checkpoint::{FileProgressStore, ProgressStore};
use crate::config::{Config, InputKind};
use crate::harvest::endpoint::{Endpoint, ExploreEndpoint, VenueMapEndpoint};
use crate::harvest::fetcher::{build_http_client, HttpTransport, RetryingFetcher};
use crate::harvest::retry::RetryPolicy;
use crate::harvest::scheduler::Scheduler;
use crate::harvest::walker::{PaginationWalker, WalkSettings};
use crate::output::{
    CsvSink, DryRunReport, HarvestCounters, ProgressReporter, RawArtifactWriter, RunSummary,
};
use crate::state::ResumeState;
use crate::unit::{load_event_pairs, load_points, LoadReport, UnitKey, WorkUnit};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Main harvest coordinator
pub struct Harvester {
    config: Arc<Config>,
    cancel: CancellationToken,
}

impl Harvester {
    /// Creates a coordinator with its own cancellation token
    pub fn new(config: Config) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Creates a coordinator stopped by `cancel`
    pub fn with_cancellation(config: Config, cancel: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            cancel,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Deletes the checkpoint so every unit starts over; the dataset is kept
    pub fn reset_checkpoint(&self) -> Result<(), HarvestError> {
        tracing::info!(
            "Fresh run requested, clearing {}",
            self.config.output.checkpoint_path
        );
        FileProgressStore::new(&self.config.output.checkpoint_path).clear()?;
        Ok(())
    }

    /// Computes what a run would dispatch without any network I/O
    pub fn plan(&self) -> Result<DryRunReport, HarvestError> {
        let (keys, load) = self.load_keys()?;
        let progress = FileProgressStore::new(&self.config.output.checkpoint_path).load()?;

        let mut report = DryRunReport {
            total: keys.len(),
            invalid: load.invalid,
            duplicates: load.duplicates,
            ..DryRunReport::default()
        };
        for key in &keys {
            match progress.get(key) {
                None => report.fresh += 1,
                Some(ResumeState::Pending(_)) => report.resumable += 1,
                Some(ResumeState::Complete) => report.complete += 1,
            }
        }

        Ok(report)
    }

    /// Runs the harvest to completion, cancellation, or a shared I/O failure
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run ended; check `aborted` for an early stop
    /// * `Err(HarvestError)` - Setup failed (units, checkpoint, dataset, client)
    pub async fn run(&self) -> Result<RunSummary, HarvestError> {
        let input = Path::new(&self.config.input.path);
        let limit = self.config.input.limit;

        match self.config.input.kind {
            InputKind::Points => {
                let (units, _) = load_points(input, limit)?;
                let endpoint = ExploreEndpoint::new(&self.config.http)?;
                self.run_endpoint(endpoint, units).await
            }
            InputKind::Venues => {
                let (units, _) = load_event_pairs(input, limit)?;
                let endpoint = VenueMapEndpoint::new(&self.config.http)?;
                self.run_endpoint(endpoint, units).await
            }
        }
    }

    async fn run_endpoint<E: Endpoint>(
        &self,
        endpoint: E,
        units: Vec<E::Unit>,
    ) -> Result<RunSummary, HarvestError> {
        if units.is_empty() {
            tracing::warn!("No valid units of work, nothing to harvest");
            return Ok(RunSummary::default());
        }

        let config = &self.config;
        let store = Arc::new(FileProgressStore::new(&config.output.checkpoint_path));
        let progress = store.load()?;

        let sink = Arc::new(CsvSink::open(&config.output.dataset_path, &endpoint.columns())?);

        let client = build_http_client(&config.http, config.retry.request_timeout())?;
        let fetcher = Arc::new(RetryingFetcher::new(
            HttpTransport::new(client),
            RetryPolicy::from(&config.retry),
        ));

        let counters = Arc::new(HarvestCounters::new());
        tracing::info!(
            "Harvesting {} units from the {} endpoint into {}",
            units.len(),
            endpoint.name(),
            config.output.dataset_path
        );

        let mut walker = PaginationWalker::new(
            Arc::new(endpoint),
            fetcher,
            sink,
            store.clone(),
            WalkSettings::from(&config.harvester),
            counters.clone(),
        );
        if let Some(dir) = &config.output.raw_dir {
            walker = walker.with_raw_artifacts(RawArtifactWriter::new(dir));
        }

        let keys: HashSet<UnitKey> = units.iter().map(WorkUnit::key).collect();

        let ticker_stop = CancellationToken::new();
        let ticker = spawn_progress_ticker(
            counters.clone(),
            keys.len() as u64,
            Duration::from_secs(config.harvester.progress_interval_secs),
            ticker_stop.clone(),
        );

        let scheduler = Scheduler::new(config.harvester.concurrency, counters, self.cancel.clone());
        let summary = scheduler.run(units, &progress, Arc::new(walker)).await;

        ticker_stop.cancel();
        if let Some(ticker) = ticker {
            let _ = ticker.await;
        }

        if summary.is_aborted() {
            return Ok(summary);
        }

        let complete = keys
            .iter()
            .filter(|key| store.state(key).is_complete())
            .count();
        if complete == keys.len() {
            if config.harvester.clear_checkpoint_on_success {
                tracing::info!("All {} units completed, removing checkpoint", complete);
                store.clear()?;
            } else {
                tracing::info!("All {} units completed", complete);
            }
        } else {
            tracing::info!(
                "{} / {} units done, the rest resumes on the next run",
                complete,
                keys.len()
            );
        }

        Ok(summary)
    }

    fn load_keys(&self) -> Result<(Vec<UnitKey>, LoadReport), HarvestError> {
        let input = Path::new(&self.config.input.path);
        let limit = self.config.input.limit;

        let loaded = match self.config.input.kind {
            InputKind::Points => {
                let (units, load) = load_points(input, limit)?;
                (units.iter().map(WorkUnit::key).collect(), load)
            }
            InputKind::Venues => {
                let (units, load) = load_event_pairs(input, limit)?;
                (units.iter().map(WorkUnit::key).collect(), load)
            }
        };

        Ok(loaded)
    }
}

/// Logs the progress line every `every` until `stop` is cancelled
///
/// A zero interval disables the ticker.
fn spawn_progress_ticker(
    counters: Arc<HarvestCounters>,
    total: u64,
    every: Duration,
    stop: CancellationToken,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let started = tokio::time::Instant::now();
        let mut interval = tokio::time::interval(every);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = interval.tick() => {
                    let snapshot = counters.snapshot();
                    tracing::info!(
                        "{} | {} active | {} rows",
                        ProgressReporter::report(snapshot.done(), total, started.elapsed()),
                        snapshot.active,
                        snapshot.rows_written
                    );
                }
            }
        }
    }))
}
