//! 传输抽象：上游原始响应与下游响应写出器。
//!
//! Transport-facing abstractions. The relay never sends the upstream request itself;
//! it receives the raw [`UpstreamResponse`] from the caller and writes the translated
//! result into a [`ResponseWriter`].

pub mod http;

use bytes::{Bytes, BytesMut};
use futures::{stream, TryStreamExt};
use std::collections::HashMap;
use thiserror::Error;

use crate::{BoxStream, Result};

pub use http::HttpMediaFetcher;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Rejected URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Raw vendor response handed to the dispatcher. Consuming it closes the body.
pub struct UpstreamResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: BoxStream<'static, Bytes>,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl UpstreamResponse {
    pub fn new(status: u16, body: BoxStream<'static, Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// A fully buffered response.
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status, Box::pin(stream::once(async move { Ok::<_, crate::Error>(body) })))
    }

    pub fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes_stream()
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)));
        Self {
            status,
            headers,
            body: Box::pin(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Read the whole body.
    pub async fn read_body(self) -> Result<Bytes> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Hand the body over unread, for stream handlers.
    pub fn into_body(self) -> BoxStream<'static, Bytes> {
        self.body
    }
}

/// Outbound response stream of the relay's own caller.
pub trait ResponseWriter: Send {
    fn write_head(&mut self, status: u16, content_type: &str);
    fn write_body(&mut self, chunk: &[u8]) -> std::io::Result<()>;
}

/// In-memory [`ResponseWriter`].
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<u16>,
    content_type: Option<String>,
    body: BytesMut,
}

impl BufferedResponse {
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.body.is_empty()
    }
}

impl ResponseWriter for BufferedResponse {
    fn write_head(&mut self, status: u16, content_type: &str) {
        self.status = Some(status);
        self.content_type = Some(content_type.to_string());
    }

    fn write_body(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}
