use crate::common::{events_page, requested_pages, Workspace, TOKYO_INPUT};
use ripple_harvest::config::InputKind;
use ripple_harvest::harvest::Harvester;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, page: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/explore"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Two pages of events followed by the empty terminal page
async fn mount_three_pages(server: &MockServer) {
    mount_page(server, "0", events_page(&[1, 2], 3)).await;
    mount_page(server, "1", events_page(&[3], 3)).await;
    mount_page(server, "2", events_page(&[], 0)).await;
}

fn read_rows(workspace: &Workspace) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(workspace.path("out.csv")).expect("Dataset exists");
    reader.records().map(|r| r.expect("Valid CSV row")).collect()
}

#[tokio::test]
async fn test_walks_until_end_of_unit() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let summary = Harvester::new(workspace.config(&server, InputKind::Points))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.pages, 3);
    assert!(summary.aborted.is_none());

    // Page 3 is never requested
    assert_eq!(requested_pages(&server).await, vec!["0", "1", "2"]);

    let dataset = workspace.dataset();
    assert!(dataset.starts_with("city,country,page,eventId,name,url,"));

    let rows = read_rows(&workspace);
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "Tokyo");
    assert_eq!(&rows[0][1], "Japan");
    assert_eq!(&rows[0][2], "0");
    assert_eq!(&rows[0][3], "1");
    assert_eq!(&rows[0][4], "Event 1");
    assert_eq!(&rows[2][2], "1");
    assert_eq!(&rows[2][3], "3");

    // Everything finished, so the checkpoint is gone
    assert!(workspace.checkpoint().is_none());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let mut config = workspace.config(&server, InputKind::Points);
    config.harvester.clear_checkpoint_on_success = false;

    Harvester::new(config.clone()).run().await.unwrap();
    let dataset_after_first = workspace.dataset();
    assert_eq!(
        workspace.checkpoint().as_deref(),
        Some("35.6897,139.6922,1\n35.6897,139.6922,2\n35.6897,139.6922,done\n")
    );

    let summary = Harvester::new(config).run().await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.rows, 0);
    assert_eq!(requested_pages(&server).await.len(), 3);
    assert_eq!(workspace.dataset(), dataset_after_first);
}

#[tokio::test]
async fn test_resumes_from_recorded_cursor() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let workspace = Workspace::new(TOKYO_INPUT);
    std::fs::write(workspace.path("progress.log"), "35.6897,139.6922,1\n").unwrap();

    let summary = Harvester::new(workspace.config(&server, InputKind::Points))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rows, 1);
    assert_eq!(requested_pages(&server).await, vec!["1", "2"]);

    let rows = read_rows(&workspace);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][3], "3");
}

#[tokio::test]
async fn test_forbidden_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/explore"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, "0", events_page(&[7], 1)).await;
    mount_page(&server, "1", events_page(&[], 0)).await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let summary = Harvester::new(workspace.config(&server, InputKind::Points))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rows, 1);
    assert_eq!(requested_pages(&server).await, vec!["0", "0", "1"]);
}

#[tokio::test]
async fn test_exhausted_retries_leave_unit_resumable() {
    let server = MockServer::start().await;
    mount_page(&server, "0", events_page(&[1], 2)).await;
    Mock::given(method("GET"))
        .and(path("/explore"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let harvester = Harvester::new(workspace.config(&server, InputKind::Points));
    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.rows, 1);
    // One request for page 0, three attempts for page 1
    assert_eq!(requested_pages(&server).await, vec!["0", "1", "1", "1"]);

    // The cursor still points at the failed page
    assert_eq!(
        workspace.checkpoint().as_deref(),
        Some("35.6897,139.6922,1\n")
    );
    assert_eq!(harvester.plan().unwrap().resumable, 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/explore"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let summary = Harvester::new(workspace.config(&server, InputKind::Points))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(requested_pages(&server).await, vec!["0"]);
}

#[tokio::test]
async fn test_many_units_share_the_pool() {
    let server = MockServer::start().await;
    mount_page(&server, "0", events_page(&[1], 1)).await;
    mount_page(&server, "1", events_page(&[], 0)).await;

    let input = "name,country,lat,lng\n\
                 Tokyo,Japan,35.6897,139.6922\n\
                 Oslo,Norway,59.9133,10.7389\n\
                 Rome,Italy,41.8933,12.4828\n\
                 Lima,Peru,-12.06,-77.0375\n\
                 Tokyo again,Japan,35.6897,139.6922\n\
                 Broken,Nowhere,north,south\n\
                 Quito,Ecuador,-0.22,-78.5125\n";
    let workspace = Workspace::new(input);
    let summary = Harvester::new(workspace.config(&server, InputKind::Points))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 5);
    assert_eq!(summary.rows, 5);
    assert!(summary.peak_concurrency <= 2);
    assert_eq!(requested_pages(&server).await.len(), 10);

    let cities: Vec<String> = read_rows(&workspace)
        .iter()
        .map(|row| row[0].to_string())
        .collect();
    for city in ["Tokyo", "Oslo", "Rome", "Lima", "Quito"] {
        assert!(cities.iter().any(|c| c == city), "missing {}", city);
    }
}

#[tokio::test]
async fn test_page_limit_marks_unit_done() {
    let server = MockServer::start().await;
    mount_page(&server, "0", events_page(&[1], 9)).await;
    mount_page(&server, "1", events_page(&[2], 9)).await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let mut config = workspace.config(&server, InputKind::Points);
    config.harvester.max_pages = Some(2);
    config.harvester.clear_checkpoint_on_success = false;

    let summary = Harvester::new(config).run().await.unwrap();

    assert_eq!(summary.capped, 1);
    assert_eq!(summary.rows, 2);
    assert_eq!(requested_pages(&server).await, vec!["0", "1"]);
    assert!(workspace
        .checkpoint()
        .unwrap()
        .ends_with("35.6897,139.6922,done\n"));
}

#[tokio::test]
async fn test_cancelled_run_dispatches_nothing() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let workspace = Workspace::new(TOKYO_INPUT);
    let harvester = Harvester::new(workspace.config(&server, InputKind::Points));
    harvester.cancellation_token().cancel();

    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.cancelled, 1);
    assert!(requested_pages(&server).await.is_empty());
}
