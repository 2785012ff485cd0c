use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};
use wp_export_core::{AuthorRecord, CategoryRecord, MergeOutcome};
use wp_export_engine::{
    merge_catalog, ExportError, ExportEvent, FetchSettings, NullProgressSink, ProgressSink,
    ReqwestFetcher, WpClient,
};

/// Matches the page-count request, which carries no `page` parameter.
struct WithoutPage;

impl Match for WithoutPage {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == "page")
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<ExportEvent>>,
}

impl TestSink {
    fn take(&self) -> Vec<ExportEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: ExportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

async fn mount_collection(server: &MockServer, collection: &str, pages: Vec<Value>) {
    let route = format!("/wp-json/wp/v2/{collection}");
    Mock::given(method("GET"))
        .and(path(route.as_str()))
        .and(WithoutPage)
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-WP-TotalPages", pages.len().to_string().as_str())
                .set_body_json(pages.first().cloned().unwrap_or_else(|| json!([]))),
        )
        .mount(server)
        .await;
    for (index, body) in pages.into_iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .and(query_param("page", (index + 1).to_string().as_str()))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

fn client(server: &MockServer) -> WpClient {
    let settings = FetchSettings {
        backoff_unit: Duration::from_millis(1),
        ..FetchSettings::default()
    };
    let fetcher = Arc::new(ReqwestFetcher::new(settings).unwrap());
    WpClient::new(&format!("{}/wp-json/wp/v2", server.uri()), fetcher).unwrap()
}

fn user(id: u64, slug: &str, name: &str) -> Value {
    json!({ "id": id, "slug": slug, "name": name, "link": "ignored" })
}

fn category(id: u64, slug: &str, count: u64) -> Value {
    json!({ "id": id, "slug": slug, "name": slug.to_uppercase(), "description": "", "count": count })
}

#[tokio::test]
async fn authors_are_collected_across_pages_in_order() {
    let server = MockServer::start().await;
    mount_collection(
        &server,
        "users",
        vec![
            json!([user(1, "jdoe", "Jane Doe"), user(2, "bob", "Bob")]),
            json!([user(7, "amy", "Amy")]),
        ],
    )
    .await;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("authors").join("authors.json");
    let sink = TestSink::default();

    let catalog = merge_catalog::<AuthorRecord>(
        &client(&server),
        &file,
        &sink,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let ids: Vec<u64> = catalog.records().iter().map(|a| a.remote_id).collect();
    assert_eq!(ids, vec![1, 2, 7]);

    let pages: Vec<u32> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            ExportEvent::PageFetched { page, .. } => Some(page),
            _ => None,
        })
        .collect();
    assert_eq!(pages, vec![1, 2]);

    let written: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(
        written,
        json!([
            { "id": "jdoe", "name": "Jane Doe", "remoteId": 1 },
            { "id": "bob", "name": "Bob", "remoteId": 2 },
            { "id": "amy", "name": "Amy", "remoteId": 7 }
        ])
    );
}

#[tokio::test]
async fn rerun_against_unchanged_remote_is_byte_identical() {
    let server = MockServer::start().await;
    mount_collection(
        &server,
        "users",
        vec![json!([user(1, "jdoe", "Jane Doe"), user(2, "bob", "Bob")])],
    )
    .await;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("authors.json");
    let client = client(&server);
    let cancel = CancellationToken::new();

    merge_catalog::<AuthorRecord>(&client, &file, &NullProgressSink, &cancel)
        .await
        .unwrap();
    let first = fs::read(&file).unwrap();

    let sink = TestSink::default();
    let catalog = merge_catalog::<AuthorRecord>(&client, &file, &sink, &cancel)
        .await
        .unwrap();
    let second = fs::read(&file).unwrap();

    assert_eq!(first, second);
    assert_eq!(catalog.len(), 2);
    assert!(first.ends_with(b"]\n"));
    assert!(sink.take().iter().all(|event| !matches!(
        event,
        ExportEvent::RecordMerged {
            outcome: MergeOutcome::Inserted,
            ..
        }
    )));
}

#[tokio::test]
async fn existing_authors_keep_their_position_and_values() {
    let server = MockServer::start().await;
    mount_collection(
        &server,
        "users",
        vec![json!([user(2, "bob", "Robert"), user(3, "eve", "Eve")])],
    )
    .await;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("authors.json");
    fs::write(
        &file,
        r#"[{"id":"bob","name":"Bob","remoteId":2},{"id":"old","name":"Old","remoteId":9}]"#,
    )
    .unwrap();

    let catalog = merge_catalog::<AuthorRecord>(
        &client(&server),
        &file,
        &NullProgressSink,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let names: Vec<&str> = catalog.records().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Bob", "Old", "Eve"]);
}

#[tokio::test]
async fn categories_refresh_remote_id_and_skip_empty_ones() {
    let server = MockServer::start().await;
    mount_collection(
        &server,
        "categories",
        vec![json!([
            category(15, "news", 4),
            category(16, "empty", 0),
            category(17, "tips", 2)
        ])],
    )
    .await;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("categories.json");
    fs::write(
        &file,
        r#"[{"id":"news","name":"News","description":"Local news","remoteId":3}]"#,
    )
    .unwrap();

    let sink = TestSink::default();
    let catalog = merge_catalog::<CategoryRecord>(
        &client(&server),
        &file,
        &sink,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(
        written,
        json!([
            { "id": "news", "name": "News", "description": "Local news", "remoteId": 15 },
            { "id": "tips", "name": "TIPS", "description": "", "remoteId": 17 }
        ])
    );
    assert_eq!(catalog.len(), 2);

    let outcomes: Vec<(String, MergeOutcome)> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            ExportEvent::RecordMerged { key, outcome, .. } => Some((key, outcome)),
            _ => None,
        })
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("news".to_string(), MergeOutcome::Refreshed),
            ("empty".to_string(), MergeOutcome::Filtered),
            ("tips".to_string(), MergeOutcome::Inserted),
        ]
    );
}

#[tokio::test]
async fn malformed_catalog_aborts_before_any_request() {
    let server = MockServer::start().await;
    mount_collection(&server, "users", vec![json!([user(1, "jdoe", "Jane Doe")])]).await;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("authors.json");
    fs::write(&file, "{ not json").unwrap();

    let err = merge_catalog::<AuthorRecord>(
        &client(&server),
        &file,
        &NullProgressSink,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ExportError::CatalogParse { .. }));
    assert_eq!(fs::read_to_string(&file).unwrap(), "{ not json");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_merge_leaves_catalog_untouched() {
    let server = MockServer::start().await;
    mount_collection(&server, "users", vec![json!([user(1, "jdoe", "Jane Doe")])]).await;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("authors.json");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = merge_catalog::<AuthorRecord>(&client(&server), &file, &NullProgressSink, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Cancelled));
    assert!(!file.exists());
}
