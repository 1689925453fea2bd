use async_trait::async_trait;
use base64::Engine as _;
use bytes::BytesMut;
use futures::TryStreamExt;
use reqwest::Proxy;
use std::time::Duration;
use tracing::debug;

use super::TransportError;
use crate::config::MediaSettings;
use crate::media::{guess_mime_type_from_path, sniff_mime_type, FetchedMedia, MediaFetcher};
use crate::{Error, Result};

/// Fetches remote media over HTTP(S) and returns it base64-encoded.
#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpMediaFetcher {
    pub fn new(settings: &MediaSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &settings.proxy_url {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| Error::configuration(format!("Invalid media proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            Error::configuration(format!("Failed to create media HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }

    fn parse_url(raw: &str) -> Result<url::Url> {
        let parsed = url::Url::parse(raw).map_err(|e| {
            Error::Transport(TransportError::InvalidUrl {
                url: truncate(raw),
                reason: e.to_string(),
            })
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(Error::Transport(TransportError::InvalidUrl {
                url: truncate(raw),
                reason: format!("unsupported scheme '{}'", scheme),
            })),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, raw_url: &str) -> Result<FetchedMedia> {
        let url = Self::parse_url(raw_url)?;
        debug!(url = %url, "fetching remote media");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }
        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(Error::Transport(TransportError::TooLarge {
                    limit: self.max_bytes,
                }));
            }
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty() && v != "application/octet-stream");

        let mut body = response.bytes_stream();
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.try_next().await.map_err(TransportError::Http)? {
            if (buf.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(Error::Transport(TransportError::TooLarge {
                    limit: self.max_bytes,
                }));
            }
            buf.extend_from_slice(&chunk);
        }

        let mime_type = header_mime
            .or_else(|| guess_mime_type_from_path(url.path()).map(String::from))
            .or_else(|| sniff_mime_type(&buf).map(String::from))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(FetchedMedia {
            mime_type,
            base64_data: base64::engine::general_purpose::STANDARD.encode(&buf),
        })
    }
}

fn truncate(raw: &str) -> String {
    raw.chars().take(64).collect()
}
