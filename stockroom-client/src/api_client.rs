use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use stockroom_model::{
    CacheEntry, CacheKey, ExistsResponse, HealthResponse, MaterializeRequest,
    MaterializeResponse,
    routes::{HEALTH, v1::images},
};
use stockroom_core::MirrorSettings;
use url::Url;

use crate::{
    api::MirrorApi,
    error::{ClientError, ErrorEnvelope},
};

/// Headroom on top of the server's flight budget for queueing and transport.
const REQUEST_SLACK: Duration = Duration::from_secs(15);

/// Request timeout used by [`ApiClient::new`].
///
/// A materialize call only answers once the server's flight is over, so
/// the timeout has to outlast a flight that exhausts the default retry
/// budget. Otherwise a slow but successful download would surface here as
/// a transport error and the resolver would never swap to the local copy.
pub fn default_request_timeout() -> Duration {
    MirrorSettings::new("").flight_budget() + REQUEST_SLACK
}

/// HTTP client for a running `stockroom-server`.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url`.
    ///
    /// A missing scheme defaults to `http://` and a trailing slash is
    /// dropped, so `localhost:8088/` and `http://localhost:8088` are the
    /// same server.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, default_request_timeout())
    }

    /// Like [`ApiClient::new`] with a custom per-request timeout. The
    /// materialize call waits for the download, so the timeout should
    /// cover the server's whole retry budget.
    pub fn with_timeout(
        base_url: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(base_url.as_ref())?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        info!("[ApiClient] Creating mirror API client with base URL: {base_url}");
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a route path.
    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        let path = path.as_ref();
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// URL serving the mirrored bytes of `key`.
    pub fn blob_url(&self, key: &CacheKey) -> String {
        self.build_url(images::blob_path(key))
    }

    pub async fn entry(&self, key: &CacheKey) -> Result<CacheEntry, ClientError> {
        let url = self.build_url(images::entry_path(key));
        self.execute(self.client.get(&url), &url).await
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.build_url(HEALTH);
        self.execute(self.client.get(&url), &url).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, ClientError> {
        let response =
            request
                .send()
                .await
                .map_err(|source| ClientError::Transport {
                    url: url.to_string(),
                    source,
                })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|source| {
                ClientError::Decode {
                    url: url.to_string(),
                    source,
                }
            });
        }

        Err(rejection(status, response.text().await.unwrap_or_default()))
    }
}

#[async_trait]
impl MirrorApi for ApiClient {
    async fn check_exists(
        &self,
        key: &CacheKey,
    ) -> Result<ExistsResponse, ClientError> {
        let url = self.build_url(images::exists_path(key));
        debug!("[ApiClient] Checking {key} at {url}");
        self.execute(self.client.get(&url), &url).await
    }

    async fn materialize(
        &self,
        key: &CacheKey,
        remote_url: &str,
    ) -> Result<MaterializeResponse, ClientError> {
        let url = self.build_url(images::MATERIALIZE);
        let body = MaterializeRequest {
            key: key.clone().into(),
            remote_url: remote_url.to_string(),
        };
        debug!("[ApiClient] Requesting materialize of {key}");
        self.execute(self.client.post(&url).json(&body), &url).await
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let invalid = |reason: &str| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => {
            ("http", rest)
        }
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("https") => {
            ("https", rest)
        }
        Some((scheme, _)) => {
            return Err(invalid(&format!("unsupported scheme {scheme:?}")));
        }
        None => ("http", trimmed),
    };

    // Trailing slashes are stripped after the scheme is split off so that
    // `http://` cannot collapse into a bare `http:` host.
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(invalid("missing host"));
    }
    let normalized = format!("{scheme}://{rest}");

    let parsed = Url::parse(&normalized).map_err(|err| invalid(&err.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }

    if normalized != raw {
        warn!("[ApiClient] Normalized base URL from '{raw}' to '{normalized}'");
    }
    Ok(normalized)
}

fn rejection(status: StatusCode, body: String) -> ClientError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => ClientError::Rejected {
            status: status.as_u16(),
            message: envelope.error.message,
            kind: envelope.error.kind,
        },
        Err(_) => ClientError::Rejected {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
            kind: None,
        },
    }
}
