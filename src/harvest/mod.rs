//! Harvest module for paginated fetching
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry and backoff
//! - Page decoding and end-of-unit detection
//! - The per-unit pagination walker
//! - The bounded worker pool and overall run coordination

mod coordinator;
mod endpoint;
mod fetcher;
mod parser;
mod retry;
mod scheduler;
mod walker;

pub use coordinator::Harvester;
pub use endpoint::{Endpoint, ExploreEndpoint, VenueMapEndpoint, EVENT_FIELDS, VENUE_COLUMNS};
pub use fetcher::{
    build_http_client, classify_status, FetchError, FetchRequest, Fetcher, HttpTransport,
    RawResponse, RetryingFetcher, Transport,
};
pub use parser::{cell, parse_document, parse_listing, ListingPage, PageOutcome, ParseError};
pub use retry::{retry_with_backoff, RetryError, RetryPolicy, Retryable};
pub use scheduler::{Scheduler, UnitRunner};
pub use walker::{PaginationWalker, WalkSettings};

use crate::config::Config;
use crate::output::RunSummary;
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point for starting a run. It will:
/// 1. Load the units of work
/// 2. Load the checkpoint and open the dataset
/// 3. Build the HTTP client
/// 4. Walk every unit not yet complete
/// 5. Clear the checkpoint if everything finished
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run ended (possibly early, see `RunSummary::aborted`)
/// * `Err(HarvestError)` - Setup failed
pub async fn harvest(config: Config) -> Result<RunSummary, HarvestError> {
    Harvester::new(config).run().await
}
