use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use stockroom_client::{
    ApiClient, ClientError, DisplaySource, ImageResolver, LocalMirror,
    MirrorApi, ResolverState,
};
use stockroom_core::{MirrorService, MirrorSettings, RetryPolicy};
use stockroom_model::{CacheKey, CacheStatus, ErrorKind};
use stockroom_server::{AppState, create_app};
use tempfile::TempDir;

const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H',
    b'D', b'R',
];

async fn png() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG)
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct Harness {
    upstream: SocketAddr,
    mirror: MirrorService,
    client: ApiClient,
    _dir: TempDir,
}

impl Harness {
    async fn start() -> Self {
        let upstream = serve(
            Router::new()
                .route("/photo.png", get(png))
                .route("/missing.png", get(|| async { StatusCode::NOT_FOUND })),
        )
        .await;

        let dir = TempDir::new().unwrap();
        let mut settings = MirrorSettings::new(dir.path().join("images"));
        settings.fetch.timeout = Duration::from_secs(2);
        settings.retry = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        };
        let mirror = MirrorService::new(settings).unwrap();

        let server = serve(create_app(AppState::new(mirror.clone()))).await;
        let client = ApiClient::new(format!("{server}/")).unwrap();

        Self {
            upstream,
            mirror,
            client,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.upstream)
    }
}

fn key(index: u32) -> CacheKey {
    CacheKey::new("SKU123", index).unwrap()
}

#[tokio::test]
async fn client_checks_and_materializes_over_http() {
    let harness = Harness::start().await;
    let client = &harness.client;

    assert!(!client.check_exists(&key(1)).await.unwrap().exists);

    let response = client
        .materialize(&key(1), &harness.url("/photo.png"))
        .await
        .unwrap();
    assert!(response.success);
    let local_path = response.local_path.unwrap();
    assert_eq!(std::fs::read(&local_path).unwrap(), PNG);

    let found = client.check_exists(&key(1)).await.unwrap();
    assert!(found.exists);
    assert_eq!(found.local_path.as_deref(), Some(local_path.as_str()));

    let entry = client.entry(&key(1)).await.unwrap();
    assert_eq!(entry.status(), CacheStatus::Ready);
    assert_eq!(entry.attempt_count, 1);

    let health = client.health().await.unwrap();
    assert_eq!(health.entries, 1);

    let blob = reqwest::get(client.blob_url(&key(1))).await.unwrap();
    assert_eq!(blob.status(), reqwest::StatusCode::OK);
    assert_eq!(blob.bytes().await.unwrap().as_ref(), PNG);
}

#[tokio::test]
async fn failed_download_arrives_as_unsuccessful_response() {
    let harness = Harness::start().await;

    let response = harness
        .client
        .materialize(&key(2), &harness.url("/missing.png"))
        .await
        .unwrap();

    assert!(!response.success);
    assert_eq!(response.error_kind, Some(ErrorKind::Network));
    assert!(response.local_path.is_none());
}

#[tokio::test]
async fn resolver_swaps_to_mirrored_copy_over_http() {
    let harness = Harness::start().await;
    let api: Arc<dyn MirrorApi> = Arc::new(harness.client.clone());
    let remote = harness.url("/photo.png");

    let resolver =
        ImageResolver::new(api.clone(), "SKU123", 1, Some(remote.clone()));
    let mut rx = resolver.subscribe();
    let first = resolver.resolve().await;
    assert_eq!(first.display(), DisplaySource::Remote(remote.clone()));

    let settled = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| matches!(state, ResolverState::ShowingLocal { .. })),
    )
    .await
    .expect("resolver never swapped")
    .unwrap()
    .clone();
    let ResolverState::ShowingLocal { local_path } = settled else {
        unreachable!()
    };
    assert!(local_path.is_file());

    // A later slot for the same key starts from the mirrored copy.
    let again = ImageResolver::new(api, "SKU123", 1, Some(remote));
    assert_eq!(
        again.resolve().await,
        ResolverState::ShowingLocal { local_path }
    );
    assert_eq!(harness.mirror.entry_count(), 1);
}

#[tokio::test]
async fn unreachable_mirror_degrades_to_remote_only() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        ApiClient::with_timeout(format!("http://{addr}"), Duration::from_secs(2))
            .unwrap();
    let err = client.check_exists(&key(1)).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.kind(), ErrorKind::ClientTransport);

    let remote = "https://img.example.com/SKU123/1.png".to_string();
    let resolver =
        ImageResolver::new(Arc::new(client), "SKU123", 1, Some(remote.clone()));
    assert_eq!(
        resolver.resolve().await,
        ResolverState::ShowingRemote {
            remote_url: remote,
            materializing: false
        }
    );
}

#[tokio::test]
async fn local_mirror_drives_resolver_in_process() {
    let harness = Harness::start().await;
    let local = LocalMirror::new(harness.mirror.clone());
    let remote = harness.url("/photo.png");

    let resolver =
        ImageResolver::new(Arc::new(local), "SKU123", 4, Some(remote));
    let mut rx = resolver.subscribe();
    resolver.resolve().await;

    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| matches!(state, ResolverState::ShowingLocal { .. })),
    )
    .await
    .expect("resolver never swapped")
    .unwrap();
    assert!(harness.mirror.check_exists(&key(4)).exists);
}
