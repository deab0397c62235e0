use std::fmt::Debug;

use async_trait::async_trait;
use stockroom_model::{CacheKey, ExistsResponse, MaterializeResponse};

use crate::error::ClientError;

/// The two mirror operations a consumer needs.
///
/// Implemented over HTTP by [`crate::ApiClient`] and in-process by
/// [`crate::LocalMirror`].
#[async_trait]
pub trait MirrorApi: Send + Sync + Debug {
    async fn check_exists(
        &self,
        key: &CacheKey,
    ) -> Result<ExistsResponse, ClientError>;

    /// Resolves once the download has reached a terminal outcome. Download
    /// failures come back as `Ok` with `success == false`.
    async fn materialize(
        &self,
        key: &CacheKey,
        remote_url: &str,
    ) -> Result<MaterializeResponse, ClientError>;
}
