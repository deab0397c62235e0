use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum_test::TestServer;
use stockroom_core::{
    FetchError, FetchedImage, ImageFetcher, MirrorService, MirrorSettings,
    RetryPolicy,
};
use stockroom_server::{AppState, create_app};
use tempfile::TempDir;

pub const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H',
    b'D', b'R',
];

/// Upstream stand-in that answers per URL and counts requests.
#[derive(Debug, Default)]
pub struct FakeUpstream {
    routes: Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>,
    calls: AtomicUsize,
}

// Code is used by test modules, but not in every one of them
#[allow(unused)]
impl FakeUpstream {
    pub fn serve(&self, url: &str, bytes: &[u8]) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(bytes.to_vec()));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Err(FetchError::Status {
                status,
                url: url.to_string(),
            }),
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for FakeUpstream {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.routes.lock().unwrap().get(url).cloned();
        match answer {
            Some(Ok(bytes)) => Ok(FetchedImage {
                declared_len: Some(bytes.len() as u64),
                bytes,
            }),
            Some(Err(err)) => Err(err),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub mirror: MirrorService,
    pub upstream: Arc<FakeUpstream>,
    pub dir: TempDir,
}

pub fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());

    let mut settings = MirrorSettings::new(dir.path().join("images"));
    settings.retry = RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    };
    let mirror =
        MirrorService::with_fetcher(settings, upstream.clone()).unwrap();

    let server =
        TestServer::new(create_app(AppState::new(mirror.clone()))).unwrap();

    TestApp {
        server,
        mirror,
        upstream,
        dir,
    }
}
