use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main configuration structure for Ripple-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Worker pool and pagination behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarvesterConfig {
    /// Number of units harvested in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Courtesy delay between two pages of the same unit (milliseconds)
    #[serde(default = "default_inter_page_delay_ms")]
    pub inter_page_delay_ms: u64,

    /// Safety valve: stop a unit once this many pages have been walked
    ///
    /// `0` in the file turns the valve off.
    #[serde(
        default = "default_max_pages",
        deserialize_with = "deserialize_page_limit"
    )]
    pub max_pages: Option<u32>,

    /// Whether a unit that hits `max_pages` is checkpointed as done
    #[serde(default = "default_true")]
    pub complete_on_page_limit: bool,

    /// Consecutive unparseable responses tolerated for a single page
    #[serde(default = "default_max_parse_failures")]
    pub max_parse_failures: u32,

    /// Remove the checkpoint once every enumerated unit is complete
    #[serde(default = "default_true")]
    pub clear_checkpoint_on_success: bool,

    /// Interval of the periodic progress line (seconds, 0 disables it)
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,
}

/// Network retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles after each failure (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Timeout of a single request (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Remote service and fixed header set
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_referer")]
    pub referer: String,

    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_accept")]
    pub accept: String,
}

/// Which kind of unit is harvested and where the units come from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InputConfig {
    pub kind: InputKind,

    /// Delimited file enumerating the units
    pub path: String,

    /// Only harvest the first N valid units
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Unit flavors understood by the harvester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    /// Geographic points walked through the explore listing
    Points,
    /// Event/category pairs resolved through the venue map lookup
    Venues,
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Consolidated CSV dataset
    pub dataset_path: String,

    /// Append-only progress log
    pub checkpoint_path: String,

    /// Directory receiving one raw body per fetched page
    #[serde(default)]
    pub raw_dir: Option<String>,
}

impl HarvesterConfig {
    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            inter_page_delay_ms: default_inter_page_delay_ms(),
            max_pages: default_max_pages(),
            complete_on_page_limit: true,
            max_parse_failures: default_max_parse_failures(),
            clear_checkpoint_on_success: true,
            progress_interval_secs: default_progress_interval_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            origin: default_origin(),
            accept: default_accept(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    5
}

fn default_inter_page_delay_ms() -> u64 {
    1000
}

fn deserialize_page_limit<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let limit = u32::deserialize(deserializer)?;
    Ok((limit > 0).then_some(limit))
}

fn default_max_pages() -> Option<u32> {
    Some(100)
}

fn default_max_parse_failures() -> u32 {
    3
}

fn default_progress_interval_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_base_url() -> String {
    "https://www.stubhub.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/114.0.0.0 Safari/537.36"
        .to_string()
}

fn default_referer() -> String {
    "https://www.stubhub.com/".to_string()
}

fn default_origin() -> String {
    "https://www.stubhub.com".to_string()
}

fn default_accept() -> String {
    "*/*".to_string()
}
