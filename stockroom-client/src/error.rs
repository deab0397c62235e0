use serde::Deserialize;
use stockroom_model::ErrorKind;
use thiserror::Error;

/// Failure talking to the mirror from the consumer side.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server rejected request with HTTP {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
        kind: Option<ErrorKind>,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    /// Server-supplied classification when present, otherwise a transport
    /// failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Rejected {
                kind: Some(kind), ..
            } => *kind,
            _ => ErrorKind::ClientTransport,
        }
    }
}

/// `{"error": {...}}` body rendered by the server for failed requests.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
    #[serde(default)]
    pub kind: Option<ErrorKind>,
}
