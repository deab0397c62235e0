//! Request/response payloads of the mirror HTTP API.

use crate::key::CacheKeyParts;

/// Coarse error classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ErrorKind {
    /// Timeout, connection failure, non-2xx remote response or an
    /// unusable payload.
    Network,
    /// Unsafe or malformed cache key.
    InvalidKey,
    /// Local disk write or rename failure.
    Storage,
    /// The consumer could not reach the mirror service.
    ClientTransport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::InvalidKey => "invalid_key",
            ErrorKind::Storage => "storage",
            ErrorKind::ClientTransport => "client_transport",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExistsResponse {
    pub exists: bool,
    pub local_path: Option<String>,
}

impl ExistsResponse {
    pub fn hit(local_path: impl Into<String>) -> Self {
        Self {
            exists: true,
            local_path: Some(local_path.into()),
        }
    }

    pub fn miss() -> Self {
        Self {
            exists: false,
            local_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterializeRequest {
    pub key: CacheKeyParts,
    pub remote_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterializeResponse {
    pub success: bool,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub local_path: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error_kind: Option<ErrorKind>,
}

impl MaterializeResponse {
    pub fn ready(local_path: impl Into<String>) -> Self {
        Self {
            success: true,
            local_path: Some(local_path.into()),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            local_path: None,
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub entries: usize,
}
