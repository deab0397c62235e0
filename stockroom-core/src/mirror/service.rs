use std::{fmt, sync::Arc};

use stockroom_model::{
    CacheEntry, CacheKey, ExistsResponse, MaterializeResponse, ReadyImage,
};
use tracing::{info, warn};

use crate::{
    error::{Result, StoreError},
    infra::{
        cache::{CacheRegistry, LocalStore},
        fetch::{HttpFetcher, ImageFetcher},
    },
    mirror::{
        checker::ExistenceChecker,
        materializer::{Materializer, describe_stored},
        settings::MirrorSettings,
    },
};

/// Facade over the registry, store, checker and materializer.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct MirrorService {
    registry: Arc<CacheRegistry>,
    store: LocalStore,
    checker: ExistenceChecker,
    materializer: Arc<Materializer>,
}

impl MirrorService {
    /// Build a service that fetches over HTTP.
    pub fn new(settings: MirrorSettings) -> Result<Self> {
        let fetcher = HttpFetcher::new(&settings.fetch)?;
        Self::with_fetcher(settings, Arc::new(fetcher))
    }

    pub fn with_fetcher(
        settings: MirrorSettings,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Result<Self> {
        // Local paths handed to callers must not depend on the process cwd.
        let root = std::path::absolute(&settings.store_root).map_err(|err| {
            StoreError::io("resolve store root", &settings.store_root, err)
        })?;

        let registry = Arc::new(CacheRegistry::new());
        let store = LocalStore::new(root);
        let materializer = Arc::new(Materializer::new(
            Arc::clone(&registry),
            store.clone(),
            fetcher,
            settings.retry,
            settings.fetch_concurrency,
        ));

        Ok(Self {
            checker: ExistenceChecker::new(Arc::clone(&registry)),
            registry,
            store,
            materializer,
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn entry_count(&self) -> usize {
        self.registry.len()
    }

    pub fn check_exists(&self, key: &CacheKey) -> ExistsResponse {
        self.checker.check(key)
    }

    pub fn entry(&self, key: &CacheKey) -> CacheEntry {
        self.registry.snapshot(key)
    }

    pub fn ready_image(&self, key: &CacheKey) -> Option<ReadyImage> {
        self.registry.ready(key)
    }

    /// Materialize and report the outcome as an API payload. Failures are
    /// carried in the response, never returned as errors.
    pub async fn materialize(
        &self,
        key: &CacheKey,
        remote_url: &str,
    ) -> MaterializeResponse {
        match self.materialize_image(key, remote_url).await {
            Ok(image) => {
                MaterializeResponse::ready(image.local_path.to_string_lossy())
            }
            Err(err) => MaterializeResponse::failed(err.kind(), err.to_string()),
        }
    }

    pub async fn materialize_image(
        &self,
        key: &CacheKey,
        remote_url: &str,
    ) -> Result<ReadyImage> {
        self.materializer.materialize(key, remote_url).await
    }

    /// Fire-and-forget materialization.
    pub fn enqueue_materialize(&self, key: &CacheKey, remote_url: &str) -> bool {
        self.materializer.enqueue(key, remote_url)
    }

    /// Register every complete blob already on disk as `Ready` and sweep
    /// temp files left by interrupted writes. Returns how many were adopted.
    pub async fn rehydrate(&self) -> Result<usize> {
        self.store.ensure_root().await?;
        let stored = self.store.scan().await?;

        let mut adopted = 0usize;
        for file in stored {
            let bytes = match tokio::fs::read(&file.path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(path = %file.path.display(), error = %err, "skipping unreadable blob");
                    continue;
                }
            };
            let Some(image) = describe_stored(file.path.clone(), &bytes) else {
                warn!(path = %file.path.display(), "skipping stored blob that is not an image");
                continue;
            };
            if self.registry.adopt(&file.key, image) {
                adopted += 1;
            }
        }

        info!(adopted, root = %self.store.root().display(), "image store rehydrated");
        Ok(adopted)
    }
}

impl fmt::Debug for MirrorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorService")
            .field("root", &self.store.root())
            .field("entries", &self.registry.len())
            .finish()
    }
}
