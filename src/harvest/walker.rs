//! Pagination walker - drives one unit through its pages
//!
//! For each page the walker fetches, parses, then persists. Rows are
//! appended to the sink before the checkpoint records the next cursor, so a
//! crash between the two writes leaves the checkpoint behind the dataset,
//! never ahead of it. Pages of one unit are strictly sequential.

use crate::checkpoint::ProgressStore;
use crate::config::HarvesterConfig;
use crate::harvest::endpoint::Endpoint;
use crate::harvest::fetcher::Fetcher;
use crate::harvest::parser::PageOutcome;
use crate::harvest::scheduler::UnitRunner;
use crate::output::{HarvestCounters, RawArtifactWriter, ResultSink};
use crate::state::{UnitOutcome, WalkState};
use crate::unit::WorkUnit;
use crate::HarvestError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pagination tunables, taken from `[harvester]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkSettings {
    /// Courtesy delay after every page
    pub inter_page_delay: Duration,

    /// Safety valve on the page cursor
    pub max_pages: Option<u32>,

    /// Whether hitting `max_pages` marks the unit done
    pub complete_on_page_limit: bool,

    /// Consecutive unparseable responses tolerated for one page
    pub max_parse_failures: u32,
}

impl From<&HarvesterConfig> for WalkSettings {
    fn from(config: &HarvesterConfig) -> Self {
        Self {
            inter_page_delay: config.inter_page_delay(),
            max_pages: config.max_pages,
            complete_on_page_limit: config.complete_on_page_limit,
            max_parse_failures: config.max_parse_failures.max(1),
        }
    }
}

/// Walks units of one endpoint
pub struct PaginationWalker<E, F> {
    endpoint: Arc<E>,
    fetcher: Arc<F>,
    sink: Arc<dyn ResultSink>,
    store: Arc<dyn ProgressStore>,
    raw: Option<RawArtifactWriter>,
    settings: WalkSettings,
    counters: Arc<HarvestCounters>,
}

impl<E: Endpoint, F: Fetcher> PaginationWalker<E, F> {
    pub fn new(
        endpoint: Arc<E>,
        fetcher: Arc<F>,
        sink: Arc<dyn ResultSink>,
        store: Arc<dyn ProgressStore>,
        settings: WalkSettings,
        counters: Arc<HarvestCounters>,
    ) -> Self {
        Self {
            endpoint,
            fetcher,
            sink,
            store,
            raw: None,
            settings,
            counters,
        }
    }

    /// Writes every fetched body into `raw` before it is parsed
    pub fn with_raw_artifacts(mut self, raw: RawArtifactWriter) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Walks `unit` from page `start` until a terminal state
    ///
    /// Per-unit failures come back as `Ok(UnitOutcome::Failed)`. `Err` is
    /// reserved for sink and checkpoint I/O failures, which concern every
    /// unit of the run.
    pub async fn walk(
        &self,
        unit: &E::Unit,
        start: u32,
        cancel: &CancellationToken,
    ) -> Result<UnitOutcome, HarvestError> {
        let key = unit.key();
        let label = unit.label();
        let mut state = WalkState::Resuming(start);
        let mut page = start;
        let mut pages_walked = 0u32;
        let mut rows_written = 0u64;
        let mut parse_failures = 0u32;

        tracing::info!("Starting {} ({}) at page {}", label, key, start);

        loop {
            if cancel.is_cancelled() {
                self.advance(&mut state, WalkState::StoppedFailure, &label);
                tracing::info!("{}: cancelled before page {}", label, page);
                return Ok(UnitOutcome::Cancelled { page });
            }

            if let Some(max) = self.settings.max_pages.filter(|max| page >= *max) {
                self.advance(&mut state, WalkState::StoppedFailure, &label);
                let marked_done = self.settings.complete_on_page_limit;
                if marked_done {
                    self.store.complete(&key)?;
                }
                tracing::warn!(
                    "{}: page limit {} reached ({})",
                    label,
                    max,
                    if marked_done { "marked done" } else { "left resumable" }
                );
                return Ok(UnitOutcome::PageLimit {
                    pages: pages_walked,
                    rows: rows_written,
                    marked_done,
                });
            }

            let request = match self.endpoint.build_request(unit, page) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    self.advance(&mut state, WalkState::StoppedSuccess, &label);
                    self.store.complete(&key)?;
                    tracing::info!("{}: no page {}, done", label, page);
                    return Ok(UnitOutcome::Completed {
                        pages: pages_walked,
                        rows: rows_written,
                    });
                }
                Err(e) => {
                    self.advance(&mut state, WalkState::StoppedFailure, &label);
                    tracing::error!("{}: cannot build request for page {}: {}", label, page, e);
                    return Ok(UnitOutcome::Failed {
                        page,
                        reason: e.to_string(),
                    });
                }
            };

            // Fetching
            self.advance(&mut state, WalkState::Fetching(page), &label);
            tracing::debug!("{}: fetching page {}", label, page);

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.advance(&mut state, WalkState::StoppedFailure, &label);
                    tracing::info!("{}: cancelled while fetching page {}", label, page);
                    return Ok(UnitOutcome::Cancelled { page });
                }
                result = self.fetcher.fetch(&request) => result,
            };

            let response = match fetched {
                Ok(response) => response,
                Err(e) => {
                    self.advance(&mut state, WalkState::StoppedFailure, &label);
                    tracing::error!("{}: page {} failed: {}", label, page, e);
                    return Ok(UnitOutcome::Failed {
                        page,
                        reason: e.to_string(),
                    });
                }
            };
            self.counters.add_page();

            if let Some(raw) = &self.raw {
                if let Err(e) = raw.write(&label, page, &response.body) {
                    tracing::warn!("{}: could not write raw page {}: {}", label, page, e);
                }
            }

            // Parsing
            self.advance(&mut state, WalkState::Parsing(page), &label);

            match self.endpoint.parse(unit, page, &response.body) {
                Ok(PageOutcome::EndOfUnit) => {
                    self.advance(&mut state, WalkState::StoppedSuccess, &label);
                    self.store.complete(&key)?;
                    tracing::info!(
                        "{}: end of unit at page {} ({} rows this run)",
                        label,
                        page,
                        rows_written
                    );
                    return Ok(UnitOutcome::Completed {
                        pages: pages_walked,
                        rows: rows_written,
                    });
                }
                Ok(PageOutcome::Rows(rows)) if rows.is_empty() => {
                    parse_failures = 0;
                    pages_walked += 1;
                    tracing::debug!("{}: page {} is empty, moving on", label, page);
                }
                Ok(PageOutcome::Rows(rows)) => {
                    parse_failures = 0;
                    self.advance(&mut state, WalkState::Persisting(page), &label);

                    // Sink first, checkpoint second
                    let written = self.sink.append(&rows)? as u64;
                    self.store.record(&key, page + 1)?;

                    pages_walked += 1;
                    rows_written += written;
                    self.counters.add_rows(written);
                    tracing::debug!("{}: saved {} rows from page {}", label, written, page);
                }
                Err(e) => {
                    parse_failures += 1;
                    if parse_failures >= self.settings.max_parse_failures {
                        self.advance(&mut state, WalkState::StoppedFailure, &label);
                        tracing::error!(
                            "{}: page {} unparseable {} times: {}",
                            label,
                            page,
                            parse_failures,
                            e
                        );
                        return Ok(UnitOutcome::Failed {
                            page,
                            reason: e.to_string(),
                        });
                    }
                    tracing::warn!(
                        "{}: page {} unparseable (attempt {}/{}): {}",
                        label,
                        page,
                        parse_failures,
                        self.settings.max_parse_failures,
                        e
                    );
                    if !self.pause(cancel).await {
                        self.advance(&mut state, WalkState::StoppedFailure, &label);
                        return Ok(UnitOutcome::Cancelled { page });
                    }
                    continue;
                }
            }

            page += 1;
            if !self.pause(cancel).await {
                self.advance(&mut state, WalkState::StoppedFailure, &label);
                tracing::info!("{}: cancelled before page {}", label, page);
                return Ok(UnitOutcome::Cancelled { page });
            }
        }
    }

    /// Sleeps the inter-page delay; false if cancelled meanwhile
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.settings.inter_page_delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settings.inter_page_delay) => true,
        }
    }

    fn advance(&self, state: &mut WalkState, next: WalkState, label: &str) {
        debug_assert!(
            state.can_transition_to(next),
            "illegal walk transition {} -> {}",
            state,
            next
        );
        tracing::trace!("{}: {} -> {}", label, state, next);
        *state = next;
    }
}

#[async_trait]
impl<E: Endpoint, F: Fetcher + 'static> UnitRunner<E::Unit> for PaginationWalker<E, F> {
    async fn run_unit(
        &self,
        unit: &E::Unit,
        start: u32,
        cancel: &CancellationToken,
    ) -> Result<UnitOutcome, HarvestError> {
        self.walk(unit, start, cancel).await
    }
}
