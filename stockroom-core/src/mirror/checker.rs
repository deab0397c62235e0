use std::sync::Arc;

use stockroom_model::{CacheKey, ExistsResponse};

use crate::infra::cache::CacheRegistry;

/// Registry-only lookup: no disk access, no network, no insertion.
#[derive(Debug, Clone)]
pub struct ExistenceChecker {
    registry: Arc<CacheRegistry>,
}

impl ExistenceChecker {
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        Self { registry }
    }

    pub fn check(&self, key: &CacheKey) -> ExistsResponse {
        match self.registry.ready(key) {
            Some(image) => {
                ExistsResponse::hit(image.local_path.to_string_lossy())
            }
            None => ExistsResponse::miss(),
        }
    }
}
