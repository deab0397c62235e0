mod common;

use axum::http::{StatusCode, header};
use serde_json::{Value, json};
use stockroom_model::{
    CacheKey, ExistsResponse, HealthResponse, MaterializeResponse,
    routes::{HEALTH, v1::images},
};

use common::{PNG, test_app};

const URL: &str = "https://img.example.com/SKU123/1.png";

fn key(index: u32) -> CacheKey {
    CacheKey::new("SKU123", index).unwrap()
}

fn materialize_body(sku: &str, index: u32, url: &str) -> Value {
    json!({ "key": { "sku": sku, "index": index }, "remote_url": url })
}

#[tokio::test]
async fn exists_reports_miss_before_materialize() {
    let app = test_app();

    let response = app.server.get(&images::exists_path(&key(1))).await;

    response.assert_status_ok();
    assert_eq!(response.json::<ExistsResponse>(), ExistsResponse::miss());
    assert_eq!(app.mirror.entry_count(), 0);
}

#[tokio::test]
async fn materialize_then_exists_reports_local_path() {
    let app = test_app();
    app.upstream.serve(URL, PNG);

    let response = app
        .server
        .post(images::MATERIALIZE)
        .json(&materialize_body("SKU123", 1, URL))
        .await;
    response.assert_status_ok();
    let body = response.json::<MaterializeResponse>();
    assert!(body.success);
    let local_path = body.local_path.expect("ready path");
    assert!(std::path::Path::new(&local_path).is_file());

    let exists = app
        .server
        .get(&images::exists_path(&key(1)))
        .await
        .json::<ExistsResponse>();
    assert_eq!(exists, ExistsResponse::hit(local_path));
}

#[tokio::test]
async fn failed_download_is_reported_in_a_success_response() {
    let app = test_app();
    app.upstream.fail(URL, 404);

    let response = app
        .server
        .post(images::MATERIALIZE)
        .json(&materialize_body("SKU123", 1, URL))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error_kind"], "network");
    assert!(body.get("local_path").is_none());
    assert_eq!(app.upstream.calls(), 1);

    let entry: Value = app.server.get(&images::entry_path(&key(1))).await.json();
    assert_eq!(entry["status"], "failed");
    assert_eq!(entry["attempt_count"], 1);
}

#[tokio::test]
async fn invalid_keys_are_rejected_with_invalid_key_kind() {
    let app = test_app();

    for path in [
        "/api/v1/images/SKU123/0/exists",
        "/api/v1/images/SKU123/abc/exists",
        "/api/v1/images/..%2Fetc/1/exists",
        "/api/v1/images/..secret/1",
    ] {
        let response = app.server.get(path).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["kind"], "invalid_key", "path {path}");
        assert_eq!(body["error"]["status"], 400);
    }

    let response = app
        .server
        .post(images::MATERIALIZE)
        .json(&materialize_body("../escape", 1, URL))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "invalid_key");

    assert_eq!(app.upstream.calls(), 0);
    assert_eq!(app.mirror.entry_count(), 0);
}

#[tokio::test]
async fn malformed_materialize_payload_is_a_client_error() {
    let app = test_app();

    let response = app
        .server
        .post(images::MATERIALIZE)
        .json(&json!({ "remote_url": URL }))
        .await;

    assert!(response.status_code().is_client_error());
    assert_eq!(app.upstream.calls(), 0);
}

#[tokio::test]
async fn blob_is_served_with_validators() {
    let app = test_app();
    app.upstream.serve(URL, PNG);
    app.server
        .post(images::MATERIALIZE)
        .json(&materialize_body("SKU123", 1, URL))
        .await
        .assert_status_ok();

    let response = app.server.get(&images::blob_path(&key(1))).await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), PNG);
    assert_eq!(response.header(header::CONTENT_TYPE), "image/png");
    assert_eq!(
        response.header(header::CONTENT_LENGTH),
        PNG.len().to_string().as_str()
    );
    let etag = response
        .header(header::ETAG)
        .to_str()
        .unwrap()
        .to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));

    let revalidated = app
        .server
        .get(&images::blob_path(&key(1)))
        .add_header(header::IF_NONE_MATCH, etag.clone())
        .await;
    revalidated.assert_status(StatusCode::NOT_MODIFIED);
    assert!(revalidated.as_bytes().is_empty());
    assert_eq!(app.upstream.calls(), 1);
}

#[tokio::test]
async fn blob_for_unmaterialized_key_is_not_found() {
    let app = test_app();

    let response = app.server.get(&images::blob_path(&key(3))).await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 404);
    assert_eq!(app.mirror.entry_count(), 0);
}

#[tokio::test]
async fn entry_reports_missing_without_creating_state() {
    let app = test_app();

    let entry: Value = app.server.get(&images::entry_path(&key(2))).await.json();

    assert_eq!(entry["status"], "missing");
    assert_eq!(entry["attempt_count"], 0);
    assert_eq!(entry["key"]["sku"], "SKU123");
    assert_eq!(entry["key"]["index"], 2);
    assert_eq!(app.mirror.entry_count(), 0);
}

#[tokio::test]
async fn health_reports_entry_count() {
    let app = test_app();
    app.upstream.serve(URL, PNG);
    app.mirror.materialize(&key(1), URL).await;

    let health = app.server.get(HEALTH).await.json::<HealthResponse>();

    assert_eq!(health.status, "ok");
    assert_eq!(health.entries, 1);
}

#[tokio::test]
async fn concurrent_materialize_requests_fetch_once() {
    let app = test_app();
    app.upstream.serve(URL, PNG);

    let requests = (0..6).map(|_| {
        app.server
            .post(images::MATERIALIZE)
            .json(&materialize_body("SKU123", 1, URL))
            .into_future()
    });
    let responses = futures_util::future::join_all(requests).await;

    for response in responses {
        response.assert_status_ok();
        assert!(response.json::<MaterializeResponse>().success);
    }
    assert_eq!(app.upstream.calls(), 1);
}
