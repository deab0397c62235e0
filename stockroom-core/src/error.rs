use std::{path::PathBuf, sync::Arc};

use stockroom_model::{ErrorKind, KeyError};
use thiserror::Error;

/// Failure while fetching remote bytes.
///
/// Carries rendered reasons instead of the transport error itself so a single
/// outcome can be handed to every caller waiting on the same flight.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid remote url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("remote returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed reading body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("truncated payload from {url}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("payload from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("empty payload from {url}")]
    Empty { url: String },

    #[error("payload from {url} is not a recognized image")]
    NotAnImage { url: String },

    #[error("failed to build http client: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. }
            | FetchError::Connect { .. }
            | FetchError::Body { .. }
            | FetchError::LengthMismatch { .. } => true,
            FetchError::Status { status, .. } => {
                *status == 429 || (500..=599).contains(status)
            }
            FetchError::InvalidUrl { .. }
            | FetchError::TooLarge { .. }
            | FetchError::Empty { .. }
            | FetchError::NotAnImage { .. }
            | FetchError::Client(_) => false,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("failed to {action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("no stored image at {0:?}")]
    NotFound(PathBuf),
}

impl StoreError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        StoreError::Io {
            action,
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum MirrorError {
    #[error("invalid cache key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("materialization aborted: {0}")]
    Aborted(String),
}

impl MirrorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MirrorError::InvalidKey(_) => ErrorKind::InvalidKey,
            MirrorError::Fetch(_) => ErrorKind::Network,
            MirrorError::Storage(_) | MirrorError::Aborted(_) => {
                ErrorKind::Storage
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            status: code,
            url: "https://img.example.com/a.jpg".into(),
        }
    }

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(
            !FetchError::InvalidUrl {
                url: "ftp://x".into(),
                reason: "unsupported scheme".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn error_kinds_map_to_api_classification() {
        assert_eq!(
            MirrorError::from(KeyError::ZeroIndex).kind(),
            ErrorKind::InvalidKey
        );
        assert_eq!(MirrorError::from(status(502)).kind(), ErrorKind::Network);
        assert_eq!(
            MirrorError::from(StoreError::NotFound("/tmp/x".into())).kind(),
            ErrorKind::Storage
        );
    }
}
