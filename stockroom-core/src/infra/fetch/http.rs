use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header;
use tracing::debug;
use url::Url;

use super::{FetchedImage, ImageFetcher};
use crate::{error::FetchError, mirror::settings::FetchSettings};

/// `reqwest`-backed fetcher with a mandatory per-request timeout and a
/// streaming size cap.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        // Compression is disabled so `Content-Length` describes the bytes
        // actually received.
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;

        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }
}

/// Accept only absolute http(s) URLs with a host.
pub fn parse_remote_url(raw: &str) -> Result<Url, FetchError> {
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme {other:?}"))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

fn map_transport_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_body() || err.is_decode() {
        FetchError::Body {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else if err.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::Connect {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let parsed = parse_remote_url(url)?;

        let response = self
            .client
            .get(parsed)
            .header(header::ACCEPT, "image/*")
            .send()
            .await
            .map_err(|err| map_transport_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let declared_len = response.content_length();
        if let Some(len) = declared_len
            && len > self.max_bytes
        {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }

        let capacity = declared_len.unwrap_or(0).min(self.max_bytes) as usize;
        let mut bytes = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_transport_error(url, err))?;
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(url, bytes = bytes.len(), ?declared_len, "fetched remote image");
        Ok(FetchedImage {
            bytes,
            declared_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_urls_with_a_host_are_accepted() {
        assert!(parse_remote_url("https://img.example.com/a.jpg").is_ok());
        assert!(parse_remote_url(" http://10.0.0.2:8080/a.png ").is_ok());

        for raw in [
            "ftp://img.example.com/a.jpg",
            "file:///etc/passwd",
            "not a url",
            "",
            "data:image/png;base64,AAAA",
        ] {
            let err = parse_remote_url(raw).unwrap_err();
            assert!(matches!(err, FetchError::InvalidUrl { .. }), "{raw:?}");
            assert!(!err.is_retryable());
        }
    }
}
