use crate::common::Workspace;
use ripple_harvest::config::InputKind;
use ripple_harvest::harvest::Harvester;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VENUE_PATH: &str = "/Browse/VenueMap/GetVenueMapSeatingConfig";

#[tokio::test]
async fn test_venue_lookup_posts_form_once_per_pair() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/101", VENUE_PATH)))
        .and(query_param("categoryId", "7"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("categoryId=7&withFees=true&withSeats=false"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "sections": [1, 2], "rows": 3 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::new("eventId,categoryId\n101,7\n101,7\n");
    let mut config = workspace.config(&server, InputKind::Venues);
    config.output.raw_dir = Some(workspace.path("raw").display().to_string());

    let summary = Harvester::new(config).run().await.unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rows, 1);

    let mut reader = csv::Reader::from_path(workspace.path("out.csv")).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["eventId", "categoryId", "page", "recordCount", "payloadBytes", "fetchedAt"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "101");
    assert_eq!(&rows[0][1], "7");
    assert_eq!(&rows[0][2], "0");
    assert_eq!(&rows[0][3], "2");
    assert!(!rows[0][5].is_empty());

    let raw = std::fs::read_to_string(workspace.path("raw").join("101_7_venue_p0.json")).unwrap();
    assert_eq!(rows[0][4].parse::<usize>().unwrap(), raw.len());
    assert!(raw.contains("sections"));
}

#[tokio::test]
async fn test_empty_venue_map_fails_after_parse_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/202", VENUE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(3)
        .mount(&server)
        .await;

    let workspace = Workspace::new("eventId,categoryId\n202,9\n");
    let summary = Harvester::new(workspace.config(&server, InputKind::Venues))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.rows, 0);
    assert!(workspace.checkpoint().is_none());
}

#[tokio::test]
async fn test_pairs_sharing_an_event_keep_separate_artifacts() {
    let server = MockServer::start().await;
    for category in ["7", "8"] {
        Mock::given(method("POST"))
            .and(path(format!("{}/101", VENUE_PATH)))
            .and(query_param("categoryId", category))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "categoryId": category })),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let workspace = Workspace::new("eventId,categoryId\n101,7\n101,8\n");
    let mut config = workspace.config(&server, InputKind::Venues);
    config.output.raw_dir = Some(workspace.path("raw").display().to_string());

    let summary = Harvester::new(config).run().await.unwrap();
    assert_eq!(summary.succeeded, 2);

    let raw = workspace.path("raw");
    let first = std::fs::read_to_string(raw.join("101_7_venue_p0.json")).unwrap();
    let second = std::fs::read_to_string(raw.join("101_8_venue_p0.json")).unwrap();
    assert!(first.contains("\"7\""));
    assert!(second.contains("\"8\""));
}
