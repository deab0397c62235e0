//! Single-flight download pipeline: fetch, verify, store, then record.

use std::sync::Arc;

use chrono::Utc;
use stockroom_model::{CacheKey, ReadyImage};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::{
    error::{MirrorError, StoreError},
    infra::{
        cache::{
            Admission, CacheRegistry, FlightLease, FlightOutcome, LocalStore,
            content_digest,
        },
        fetch::{ImageFetcher, sniff_content_type, verify_download},
    },
    mirror::settings::RetryPolicy,
};

pub struct Materializer {
    registry: Arc<CacheRegistry>,
    store: LocalStore,
    fetcher: Arc<dyn ImageFetcher>,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl Materializer {
    pub fn new(
        registry: Arc<CacheRegistry>,
        store: LocalStore,
        fetcher: Arc<dyn ImageFetcher>,
        retry: RetryPolicy,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            store,
            fetcher,
            retry,
            permits: Arc::new(Semaphore::new(fetch_concurrency.max(1))),
        }
    }

    /// Ensure `key` is materialized from `remote_url` and return the result
    /// of the flight this call led or joined.
    ///
    /// The download itself runs on a spawned task, so dropping the returned
    /// future only stops this caller from waiting.
    pub async fn materialize(
        self: &Arc<Self>,
        key: &CacheKey,
        remote_url: &str,
    ) -> FlightOutcome {
        match self.registry.begin(key, remote_url) {
            Admission::Ready(image) => {
                debug!(%key, "already materialized");
                Ok(image)
            }
            Admission::Join(waiter) => waiter.wait().await,
            Admission::Lead(lease) => {
                let waiter = lease.waiter();
                tokio::spawn(Arc::clone(self).run_flight(
                    lease,
                    remote_url.to_string(),
                ));
                waiter.wait().await
            }
        }
    }

    /// Start (or join) a flight without waiting for it. Returns `false` when
    /// no Tokio runtime is available to run the download.
    pub fn enqueue(self: &Arc<Self>, key: &CacheKey, remote_url: &str) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(%key, "no tokio runtime; skipping background materialize");
            return false;
        };

        match self.registry.begin(key, remote_url) {
            Admission::Ready(_) | Admission::Join(_) => {}
            Admission::Lead(lease) => {
                handle.spawn(
                    Arc::clone(self).run_flight(lease, remote_url.to_string()),
                );
            }
        }
        true
    }

    async fn run_flight(self: Arc<Self>, lease: FlightLease, remote_url: String) {
        let key = lease.key().clone();
        let outcome = self.fill(&lease, &remote_url).await;
        match &outcome {
            Ok(image) => info!(
                sku = key.sku(),
                index = key.index(),
                path = %image.local_path.display(),
                bytes = image.byte_len,
                "image materialized"
            ),
            Err(err) => warn!(
                sku = key.sku(),
                index = key.index(),
                error = %err,
                "image materialization failed"
            ),
        }
        lease.complete(outcome);
    }

    async fn fill(&self, lease: &FlightLease, remote_url: &str) -> FlightOutcome {
        let key = lease.key();

        if let Some(image) = self.adopt_stored(key).await {
            debug!(%key, "adopted blob already present in the store");
            return Ok(image);
        }

        let mut failed = 0u32;
        loop {
            let attempt = lease.record_attempt();
            let result = {
                let _permit = self.permits.acquire().await.map_err(|_| {
                    MirrorError::Aborted("fetch limiter closed".into())
                })?;
                match self.fetcher.fetch(remote_url).await {
                    Ok(fetched) => verify_download(remote_url, &fetched)
                        .map(|content_type| (fetched.bytes, content_type)),
                    Err(err) => Err(err),
                }
            };

            match result {
                Ok((bytes, content_type)) => {
                    return self.store_ready(key, &bytes, content_type).await;
                }
                Err(err)
                    if err.is_retryable()
                        && failed + 1 < self.retry.max_attempts =>
                {
                    failed += 1;
                    let backoff = self.retry.backoff_after(failed);
                    warn!(
                        sku = key.sku(),
                        index = key.index(),
                        attempt,
                        error = %err,
                        ?backoff,
                        "transient fetch failure; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Write-then-record: the entry only turns `Ready` after the store has
    /// renamed a complete file into place.
    async fn store_ready(
        &self,
        key: &CacheKey,
        bytes: &[u8],
        content_type: &'static str,
    ) -> FlightOutcome {
        let local_path = self.store.write(key, bytes).await?;
        Ok(ReadyImage {
            local_path,
            byte_len: bytes.len() as u64,
            sha256: content_digest(bytes),
            content_type: content_type.to_string(),
            ready_at: Utc::now(),
        })
    }

    async fn adopt_stored(&self, key: &CacheKey) -> Option<ReadyImage> {
        if !self.store.exists(key).await {
            return None;
        }
        let bytes = match self.store.read(key).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => return None,
            Err(err) => {
                warn!(%key, error = %err, "unreadable stored blob; refetching");
                return None;
            }
        };
        describe_stored(self.store.path_for(key), &bytes)
    }
}

/// Build a `ReadyImage` for bytes already on disk, if they look like an
/// image.
pub(crate) fn describe_stored(
    local_path: std::path::PathBuf,
    bytes: &[u8],
) -> Option<ReadyImage> {
    let content_type = sniff_content_type(bytes).ok()?;
    Some(ReadyImage {
        local_path,
        byte_len: bytes.len() as u64,
        sha256: content_digest(bytes),
        content_type: content_type.to_string(),
        ready_at: Utc::now(),
    })
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("store", &self.store)
            .field("retry", &self.retry)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}
