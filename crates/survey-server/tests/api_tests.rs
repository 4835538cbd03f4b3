//! Integration tests for the survey HTTP surface
//!
//! These tests exercise the full router: submission ingestion, origin
//! derivation, and the CSV export, against a temporary response store.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use survey_server::{
    config::Config,
    features::{self, FeatureState},
    notify::NotifierHandle,
    store::ResponseStore,
};

const ACK: &str = "Thank you for completing the survey.";
const EXPORT_PATH: &str = "/export/responses.csv";

/// Test helper to create a router backed by a temporary store
async fn create_test_app(dir: &TempDir) -> Router {
    let store = ResponseStore::new(dir.path());
    store.ensure_root().await.unwrap();

    let state = FeatureState {
        store,
        notifier: NotifierHandle::disabled(),
        ack_message: ACK.to_string(),
    };

    features::router(state, &Config::default())
}

fn submit_request(body: &str, peer: [u8; 4]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .extension(ConnectInfo(SocketAddr::from((peer, 4123))))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn export_csv(app: Router) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(EXPORT_PATH)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn csv_lines(csv: &[u8]) -> Vec<String> {
    assert_eq!(&csv[..3], b"\xef\xbb\xbf", "export must start with a BOM");
    String::from_utf8(csv[3..].to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_submit_persists_record_and_acknowledges() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(submit_request("gender=F&age=22", [203, 0, 113, 5]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], ACK.as_bytes());

    let store = ResponseStore::new(dir.path());
    let records = store.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record.get("gender"), Some("F"));
    assert_eq!(records[0].record.get("age"), Some("22"));
    assert_eq!(records[0].record.get("ip_address"), Some("203.0.113.5"));
}

#[tokio::test]
async fn test_duplicate_field_keeps_first_value() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(submit_request("field1=value1&field1=value2", [203, 0, 113, 5]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = ResponseStore::new(dir.path()).list_all().await.unwrap();
    assert_eq!(records[0].record.get("field1"), Some("value1"));
}

#[tokio::test]
async fn test_client_supplied_ip_address_is_overwritten() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(submit_request("ip_address=6.6.6.6&gender=F", [203, 0, 113, 5]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = ResponseStore::new(dir.path()).list_all().await.unwrap();
    assert_eq!(records[0].record.get("ip_address"), Some("203.0.113.5"));
}

#[tokio::test]
async fn test_forwarded_for_header_takes_precedence() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let request = Request::builder()
        .method("POST")
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", "198.51.100.7, 10.0.0.1")
        .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4123))))
        .body(Body::from("gender=F"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = ResponseStore::new(dir.path()).list_all().await.unwrap();
    assert_eq!(records[0].record.get("ip_address"), Some("198.51.100.7"));
}

#[tokio::test]
async fn test_get_submit_is_method_not_allowed() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/submit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let records = ResponseStore::new(dir.path()).list_all().await.unwrap();
    assert!(records.is_empty(), "rejected request must not create a record");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .oneshot(submit_request("a=%zz", [203, 0, 113, 5]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let records = ResponseStore::new(dir.path()).list_all().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_export_headers_and_shape() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .clone()
        .oneshot(submit_request("gender=F&age=22", [203, 0, 113, 5]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(EXPORT_PATH)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"responses.csv\""
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let lines = csv_lines(&body);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Time,age,gender,ip_address");
    assert!(lines[1].ends_with(",22,F,203.0.113.5"));
}

#[tokio::test]
async fn test_export_rows_are_rectangular_across_heterogeneous_records() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    for body in ["gender=F&age=22", "city=Berlin"] {
        let response = app
            .clone()
            .oneshot(submit_request(body, [203, 0, 113, 5]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let (status, csv) = export_csv(app).await;
    assert_eq!(status, StatusCode::OK);

    let lines = csv_lines(&csv);
    assert_eq!(lines[0], "Time,age,city,gender,ip_address");
    let header_cells = lines[0].split(',').count();
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), header_cells);
    }
    // The first record has no city, the second neither gender nor age
    assert!(lines[1].contains(",22,,F,"));
    assert!(lines[2].contains(",,Berlin,,"));
}

#[tokio::test]
async fn test_export_is_idempotent_over_unchanged_store() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .clone()
        .oneshot(submit_request("gender=F", [203, 0, 113, 5]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, first) = export_csv(app.clone()).await;
    let (_, second) = export_csv(app).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_malformed_stored_document_does_not_abort_export() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .clone()
        .oneshot(submit_request("gender=F", [203, 0, 113, 5]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    std::fs::write(dir.path().join("20200101_000000.000.json"), b"{ torn write").unwrap();

    let (status, csv) = export_csv(app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(csv_lines(&csv).len(), 2, "header plus the one valid record");
}

#[tokio::test]
async fn test_export_of_empty_store_is_header_only() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let (status, csv) = export_csv(app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(csv_lines(&csv), vec!["Time".to_string()]);
}

#[tokio::test]
async fn test_export_aborts_when_store_unreadable() {
    let dir = TempDir::new().unwrap();
    let state = FeatureState {
        store: ResponseStore::new(dir.path().join("missing")),
        notifier: NotifierHandle::disabled(),
        ack_message: ACK.to_string(),
    };
    let app = features::router(state, &Config::default());

    let (status, _) = export_csv(app).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_submit_fails_when_store_unwritable() {
    let dir = TempDir::new().unwrap();
    let state = FeatureState {
        store: ResponseStore::new(dir.path().join("missing")),
        notifier: NotifierHandle::disabled(),
        ack_message: ACK.to_string(),
    };
    let app = features::router(state, &Config::default());

    let response = app
        .oneshot(submit_request("gender=F", [203, 0, 113, 5]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
