//! 适配器抽象层 — 统一请求与厂商线协议之间的转换契约
//!
//! Adaptor abstraction. A [`RelayAdaptor`] owns every vendor-specific step of one relay
//! round trip except the network call itself: model resolution, URL and header
//! construction, request conversion and response dispatch.

pub mod gemini;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::error::RelayError;
use crate::relay::RelayInfo;
use crate::transport::{ResponseWriter, UpstreamResponse};
use crate::types::{UnifiedRequest, UnifiedResponse, Usage};
use crate::Result;

pub use gemini::GeminiAdaptor;

/// Translated response plus usage. The response is `None` when the body was
/// forwarded as-is (native passthrough) or handed to a [`StreamHandler`].
pub type Dispatched = (Option<UnifiedResponse>, Usage);

/// Vendor adaptor contract.
///
/// Call order per request: [`init`](Self::init) → [`request_url`](Self::request_url) /
/// [`setup_request_headers`](Self::setup_request_headers) →
/// [`convert_request`](Self::convert_request) → (caller sends) →
/// [`dispatch_response`](Self::dispatch_response).
#[async_trait]
pub trait RelayAdaptor: Send + Sync + std::fmt::Debug {
    /// Vendor request body produced by [`convert_request`](Self::convert_request).
    type Payload: Serialize + Send;

    fn channel_name(&self) -> &str;

    fn model_list(&self) -> &[&'static str];

    /// Resolve the effective model id on `info`. Runs once per request.
    fn init(&self, info: &mut RelayInfo);

    fn request_url(&self, info: &RelayInfo) -> Result<String>;

    fn setup_request_headers(&self, info: &RelayInfo, headers: &mut HeaderMap) -> Result<()>;

    async fn convert_request(
        &self,
        info: &RelayInfo,
        request: &UnifiedRequest,
    ) -> Result<Self::Payload>;

    /// Translate the raw vendor response, write it to `writer`, and return the
    /// translated value with its usage.
    async fn dispatch_response(
        &self,
        response: UpstreamResponse,
        info: &RelayInfo,
        writer: &mut dyn ResponseWriter,
    ) -> std::result::Result<Dispatched, RelayError>;
}

/// Which wire format a stream handler must emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Gemini SSE passed through to a native Gemini caller.
    Native,
    /// Gemini SSE translated into OpenAI chat-completion chunks.
    OpenAi,
}

/// Incremental stream decoder, supplied by the caller.
#[async_trait]
pub trait StreamHandler: Send + Sync + std::fmt::Debug {
    async fn handle_stream(
        &self,
        kind: StreamKind,
        response: UpstreamResponse,
        info: &RelayInfo,
        writer: &mut dyn ResponseWriter,
    ) -> std::result::Result<Usage, RelayError>;
}
