use async_trait::async_trait;
use stockroom_core::MirrorService;
use stockroom_model::{CacheKey, ExistsResponse, MaterializeResponse};

use crate::{api::MirrorApi, error::ClientError};

/// Adapter for applications that embed the mirror instead of calling a
/// server.
#[derive(Clone, Debug)]
pub struct LocalMirror {
    service: MirrorService,
}

impl LocalMirror {
    pub fn new(service: MirrorService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &MirrorService {
        &self.service
    }
}

#[async_trait]
impl MirrorApi for LocalMirror {
    async fn check_exists(
        &self,
        key: &CacheKey,
    ) -> Result<ExistsResponse, ClientError> {
        Ok(self.service.check_exists(key))
    }

    async fn materialize(
        &self,
        key: &CacheKey,
        remote_url: &str,
    ) -> Result<MaterializeResponse, ClientError> {
        Ok(self.service.materialize(key, remote_url).await)
    }
}
