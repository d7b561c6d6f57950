use crate::common::{events_page, requested_pages, Workspace, TOKYO_INPUT};
use ripple_harvest::config::{load_config, load_config_with_hash, InputKind};
use ripple_harvest::harvest::harvest;
use ripple_harvest::ConfigError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(workspace: &Workspace, server: &MockServer, extra: &str) -> std::path::PathBuf {
    let toml = format!(
        r#"
[harvester]
concurrency = 1
inter-page-delay-ms = 0
progress-interval-secs = 0
{extra}

[retry]
max-attempts = 2
base-delay-ms = 1

[http]
base-url = "{base}"

[input]
kind = "points"
path = "{input}"

[output]
dataset-path = "{dataset}"
checkpoint-path = "{checkpoint}"
"#,
        extra = extra,
        base = server.uri(),
        input = workspace.path("input.csv").display(),
        dataset = workspace.path("out.csv").display(),
        checkpoint = workspace.path("progress.log").display(),
    );

    let config_path = workspace.path("harvest.toml");
    std::fs::write(&config_path, toml).unwrap();
    config_path
}

#[tokio::test]
async fn test_harvest_from_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/explore"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_page(&[11, 12], 2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/explore"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_page(&[], 0)))
        .mount(&server)
        .await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let config_path = write_config(&workspace, &server, "");

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.input.kind, InputKind::Points);
    assert_eq!(config.harvester.concurrency, 1);
    assert_eq!(config.retry.max_attempts, 2);
    assert!(config.harvester.clear_checkpoint_on_success);

    let summary = harvest(config).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rows, 2);
    assert_eq!(requested_pages(&server).await, vec!["0", "1"]);
    assert_eq!(workspace.dataset().lines().count(), 3);
}

#[tokio::test]
async fn test_config_hash_is_stable() {
    let server = MockServer::start().await;
    let workspace = Workspace::new(TOKYO_INPUT);
    let config_path = write_config(&workspace, &server, "");

    let (_, first) = load_config_with_hash(&config_path).unwrap();
    let (_, second) = load_config_with_hash(&config_path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);

    write_config(&workspace, &server, "max-pages = 10");
    let (config, third) = load_config_with_hash(&config_path).unwrap();
    assert_ne!(first, third);
    assert_eq!(config.harvester.max_pages, Some(10));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let server = MockServer::start().await;
    let workspace = Workspace::new(TOKYO_INPUT);
    let config_path = write_config(&workspace, &server, "max-parse-failures = 0");

    let result = load_config(&config_path);
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}
