pub mod http;
pub mod image_validation;

use async_trait::async_trait;

use crate::error::FetchError;

pub use http::HttpFetcher;
pub use image_validation::{sniff_content_type, verify_download};

/// Raw bytes pulled from a remote host, before verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// `Content-Length` announced by the remote, if any.
    pub declared_len: Option<u64>,
}

/// Source of remote image bytes. One call is one attempt; retrying is the
/// caller's concern.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}
