use ripple_harvest::config::{
    Config, HarvesterConfig, HttpConfig, InputConfig, InputKind, OutputConfig, RetryConfig,
};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::MockServer;

pub const TOKYO_INPUT: &str = "name,country,lat,lng\nTokyo,Japan,35.6897,139.6922\n";

/// Temporary workspace holding the input, dataset and checkpoint files
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new(input: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("input.csv"), input).expect("Failed to write input");
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn dataset(&self) -> String {
        std::fs::read_to_string(self.path("out.csv")).unwrap_or_default()
    }

    pub fn checkpoint(&self) -> Option<String> {
        std::fs::read_to_string(self.path("progress.log")).ok()
    }

    /// Fast test configuration: no courtesy delay, millisecond backoff
    pub fn config(&self, server: &MockServer, kind: InputKind) -> Config {
        Config {
            harvester: HarvesterConfig {
                concurrency: 2,
                inter_page_delay_ms: 0,
                progress_interval_secs: 0,
                ..HarvesterConfig::default()
            },
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
                request_timeout_secs: 5,
            },
            http: HttpConfig {
                base_url: server.uri(),
                ..HttpConfig::default()
            },
            input: InputConfig {
                kind,
                path: self.path("input.csv").display().to_string(),
                limit: None,
            },
            output: OutputConfig {
                dataset_path: self.path("out.csv").display().to_string(),
                checkpoint_path: self.path("progress.log").display().to_string(),
                raw_dir: None,
            },
        }
    }
}

/// Page numbers of every request received so far, in arrival order
pub async fn requested_pages(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(name, _)| name == "page")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

pub fn events_page(ids: &[u64], total: u64) -> serde_json::Value {
    let events: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "eventId": id,
                "name": format!("Event {}", id),
                "venueName": "Budokan",
                "isTbd": false,
                "imageUrl": null,
            })
        })
        .collect();

    serde_json::json!({ "events": events, "total": total })
}
