use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use stockroom_core::{
    FetchError, FetchSettings, HttpFetcher, ImageFetcher, MirrorService,
    MirrorSettings, RetryPolicy,
};
use stockroom_model::{CacheKey, CacheStatus, ErrorKind};
use tempfile::TempDir;

const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H',
    b'D', b'R',
];

async fn png() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG)
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    ([(header::CONTENT_TYPE, "image/png")], PNG)
}

async fn big() -> impl IntoResponse {
    let mut body = PNG.to_vec();
    body.resize(4096, 0);
    ([(header::CONTENT_TYPE, "image/png")], body)
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/ok.png", get(png))
        .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/unavailable.png",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        )
        .route("/slow.png", get(slow))
        .route("/big.png", get(big))
        .route("/page.html", get(|| async { "<html>hello</html>" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fetch_settings() -> FetchSettings {
    FetchSettings {
        timeout: Duration::from_millis(300),
        max_bytes: 1024,
        ..FetchSettings::default()
    }
}

#[tokio::test]
async fn fetches_image_bytes_with_declared_length() {
    let addr = spawn_upstream().await;
    let fetcher = HttpFetcher::new(&fetch_settings()).unwrap();

    let fetched = fetcher
        .fetch(&format!("http://{addr}/ok.png"))
        .await
        .unwrap();
    assert_eq!(fetched.bytes, PNG);
    assert_eq!(fetched.declared_len, Some(PNG.len() as u64));
}

#[tokio::test]
async fn maps_status_codes_to_retryability() {
    let addr = spawn_upstream().await;
    let fetcher = HttpFetcher::new(&fetch_settings()).unwrap();

    let missing = fetcher
        .fetch(&format!("http://{addr}/missing.png"))
        .await
        .unwrap_err();
    assert!(matches!(missing, FetchError::Status { status: 404, .. }));
    assert!(!missing.is_retryable());

    let unavailable = fetcher
        .fetch(&format!("http://{addr}/unavailable.png"))
        .await
        .unwrap_err();
    assert!(matches!(unavailable, FetchError::Status { status: 503, .. }));
    assert!(unavailable.is_retryable());
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let addr = spawn_upstream().await;
    let fetcher = HttpFetcher::new(&fetch_settings()).unwrap();

    let err = fetcher
        .fetch(&format!("http://{addr}/slow.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn oversized_payload_is_rejected() {
    let addr = spawn_upstream().await;
    let fetcher = HttpFetcher::new(&fetch_settings()).unwrap();

    let err = fetcher
        .fetch(&format!("http://{addr}/big.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unreachable_host_is_a_connect_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new(&fetch_settings()).unwrap();
    let err = fetcher
        .fetch(&format!("http://{addr}/ok.png"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, FetchError::Connect { .. } | FetchError::Timeout { .. }),
        "{err:?}"
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn mirror_service_materializes_from_a_real_upstream() {
    let addr = spawn_upstream().await;
    let dir = TempDir::new().unwrap();
    let mut settings = MirrorSettings::new(dir.path());
    settings.fetch = fetch_settings();
    settings.retry = RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    };
    let mirror = MirrorService::new(settings).unwrap();

    let ok = CacheKey::new("SKU123", 1).unwrap();
    let response = mirror
        .materialize(&ok, &format!("http://{addr}/ok.png"))
        .await;
    assert!(response.success, "{response:?}");
    let local = response.local_path.unwrap();
    assert_eq!(tokio::fs::read(&local).await.unwrap(), PNG);
    assert_eq!(mirror.check_exists(&ok).local_path.as_deref(), Some(&*local));

    let html = CacheKey::new("SKU123", 2).unwrap();
    let response = mirror
        .materialize(&html, &format!("http://{addr}/page.html"))
        .await;
    assert_eq!(response.error_kind, Some(ErrorKind::Network));
    assert_eq!(mirror.entry(&html).status(), CacheStatus::Failed);
    assert_eq!(mirror.entry(&html).attempt_count, 1);

    let bad_url = CacheKey::new("SKU123", 3).unwrap();
    let response = mirror.materialize(&bad_url, "ftp://example.com/a.png").await;
    assert!(!response.success);
    assert_eq!(mirror.entry(&bad_url).attempt_count, 1);
}
