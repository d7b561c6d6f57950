//! Scheduler for dispatching units of work
//!
//! This module handles:
//! - A fixed pool of long-lived workers pulling from one shared queue
//! - Skipping units the checkpoint already marks complete
//! - Isolating per-unit failures from their siblings
//! - Stopping dispatch on cancellation or shared I/O failure

use crate::checkpoint::{resume_point, ProgressMap};
use crate::output::{HarvestCounters, RunSummary};
use crate::state::{ResumeState, UnitOutcome};
use crate::unit::WorkUnit;
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs one unit of work to a terminal outcome
///
/// `Err` is reserved for failures shared by every unit (dataset or
/// checkpoint I/O); they stop the whole run.
#[async_trait]
pub trait UnitRunner<U: WorkUnit>: Send + Sync + 'static {
    async fn run_unit(
        &self,
        unit: &U,
        start: u32,
        cancel: &CancellationToken,
    ) -> Result<UnitOutcome, HarvestError>;
}

/// A unit waiting in the queue with its resume cursor
struct QueuedUnit<U> {
    unit: U,
    start: u32,
}

/// Bounded worker pool
pub struct Scheduler {
    concurrency: usize,
    counters: Arc<HarvestCounters>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Number of workers, each running one unit at a time
    /// * `counters` - Shared counters, also read by the progress ticker
    /// * `cancel` - Stops dispatch when triggered
    pub fn new(concurrency: usize, counters: Arc<HarvestCounters>, cancel: CancellationToken) -> Self {
        Self {
            concurrency: concurrency.max(1),
            counters,
            cancel,
        }
    }

    pub fn counters(&self) -> &Arc<HarvestCounters> {
        &self.counters
    }

    /// Runs every unit not yet complete and waits for the pool to drain
    ///
    /// Duplicate units (same key) are dispatched once. Units marked complete
    /// in `progress` are counted as skipped without reaching a worker.
    pub async fn run<U, R>(&self, units: Vec<U>, progress: &ProgressMap, runner: Arc<R>) -> RunSummary
    where
        U: WorkUnit,
        R: UnitRunner<U>,
    {
        let started = tokio::time::Instant::now();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut seen = HashSet::new();
        let mut total = 0u64;
        let mut queued = 0usize;

        for unit in units {
            let key = unit.key();
            if !seen.insert(key.clone()) {
                tracing::debug!("Ignoring duplicate unit {}", key);
                continue;
            }
            total += 1;

            match resume_point(progress, &key) {
                ResumeState::Complete => {
                    tracing::debug!("Already completed: {}", unit.label());
                    self.counters.record_outcome(&UnitOutcome::Skipped);
                }
                ResumeState::Pending(start) => {
                    // The receiver is alive until the workers finish
                    if tx.send(QueuedUnit { unit, start }).is_ok() {
                        queued += 1;
                    }
                }
            }
        }
        drop(tx);

        let workers = self.concurrency.min(queued);
        tracing::info!(
            "Dispatching {} units ({} already complete) with {} workers",
            queued,
            total - queued as u64,
            workers
        );

        let queue = Arc::new(AsyncMutex::new(rx));
        let run_cancel = self.cancel.child_token();
        let abort_reason: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(worker_loop(
                worker_id,
                queue.clone(),
                runner.clone(),
                self.counters.clone(),
                run_cancel.clone(),
                abort_reason.clone(),
            ));
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        // Whatever is still queued was never dispatched
        let mut undispatched = 0u64;
        {
            let mut rx = queue.lock().await;
            while rx.try_recv().is_ok() {
                undispatched += 1;
            }
        }
        if undispatched > 0 {
            tracing::info!("{} units were not dispatched", undispatched);
            self.counters.record_undispatched(undispatched);
        }

        let mut summary = RunSummary::from_snapshot(total, &self.counters.snapshot(), started.elapsed());
        summary.aborted = abort_reason
            .lock()
            .ok()
            .and_then(|reason| reason.as_ref().cloned());
        summary
    }
}

async fn worker_loop<U, R>(
    worker_id: usize,
    queue: Arc<AsyncMutex<mpsc::UnboundedReceiver<QueuedUnit<U>>>>,
    runner: Arc<R>,
    counters: Arc<HarvestCounters>,
    cancel: CancellationToken,
    abort_reason: Arc<Mutex<Option<String>>>,
) where
    U: WorkUnit,
    R: UnitRunner<U>,
{
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let next = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(QueuedUnit { unit, start }) = next else {
            break;
        };

        tracing::trace!("Worker {} picked {}", worker_id, unit.label());
        counters.unit_started();
        let result = runner.run_unit(&unit, start, &cancel).await;
        counters.unit_finished();

        match result {
            Ok(outcome) => {
                match &outcome {
                    UnitOutcome::Failed { .. } => {
                        tracing::error!("{}: {}", unit.label(), outcome)
                    }
                    _ => tracing::info!("{}: {}", unit.label(), outcome),
                }
                counters.record_outcome(&outcome);
            }
            Err(e) => {
                counters.record_failure();
                if e.is_shared_io() {
                    tracing::error!("{}: {}; stopping the run", unit.label(), e);
                    if let Ok(mut reason) = abort_reason.lock() {
                        reason.get_or_insert_with(|| e.to_string());
                    }
                    cancel.cancel();
                } else {
                    tracing::error!("{}: {}", unit.label(), e);
                }
            }
        }
    }
}
