//! Google Gemini 适配器 — 统一请求与 Gemini 线协议之间的双向转换
//!
//! Google Gemini adaptor. Differences from the OpenAI shape it is fed with:
//! - `contents[].parts[]` instead of `messages[].content`; `assistant` becomes `model`.
//! - System messages go to the top-level `systemInstruction`.
//! - Sampling knobs live under `generationConfig`; reasoning under `thinkingConfig`.
//! - Images use the Imagen `predict` action, embeddings `embedContent`.
//! - The API key travels in the `x-goog-api-key` header.

mod constants;
mod convert;
mod directive;
pub mod endpoint;
mod parts;
mod response;
pub mod wire;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::GeminiSettings;
use crate::drivers::{Dispatched, RelayAdaptor, StreamHandler};
use crate::error::RelayError;
use crate::media::MediaFetcher;
use crate::relay::RelayInfo;
use crate::transport::{HttpMediaFetcher, ResponseWriter, UpstreamResponse};
use crate::types::UnifiedRequest;
use crate::{Error, Result};

pub use constants::{CHANNEL_NAME, MODEL_LIST};
pub use convert::{aspect_ratio, OUTPUT_DIMENSIONALITY_MODEL};
pub use directive::{ModelDirective, ReasoningMode};
pub use endpoint::{resolve_url, ModelFamily, VersionLookup};
pub use response::{finish_reason, IMAGE_TOKENS_PER_IMAGE};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Converted request body, one variant per Gemini action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VendorPayload {
    Chat(wire::GeminiChatRequest),
    Image(wire::GeminiImageRequest),
    Embedding(wire::GeminiEmbeddingRequest),
}

impl VendorPayload {
    /// JSON body ready to send upstream.
    pub fn to_body(&self) -> Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from).map_err(Error::Encode)
    }
}

/// Gemini implementation of [`RelayAdaptor`]. Cheap to clone; clones share settings
/// and collaborators.
#[derive(Debug, Clone)]
pub struct GeminiAdaptor {
    settings: Arc<GeminiSettings>,
    fetcher: Arc<dyn MediaFetcher>,
    stream_handler: Option<Arc<dyn StreamHandler>>,
}

impl GeminiAdaptor {
    pub fn builder() -> GeminiAdaptorBuilder {
        GeminiAdaptorBuilder::new()
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }

    fn directive<'a>(&self, info: &'a RelayInfo) -> Result<&'a ModelDirective> {
        info.directive.as_ref().ok_or_else(|| {
            Error::configuration(format!(
                "model '{}' has not been resolved; call init first",
                info.origin_model
            ))
        })
    }
}

/// Builder for [`GeminiAdaptor`].
///
/// Without an explicit media fetcher, an [`HttpMediaFetcher`] is created from the
/// media settings. Without a stream handler, streaming responses are rejected.
#[derive(Debug, Default)]
pub struct GeminiAdaptorBuilder {
    settings: Option<GeminiSettings>,
    fetcher: Option<Arc<dyn MediaFetcher>>,
    stream_handler: Option<Arc<dyn StreamHandler>>,
}

impl GeminiAdaptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: GeminiSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn media_fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn stream_handler(mut self, handler: Arc<dyn StreamHandler>) -> Self {
        self.stream_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<GeminiAdaptor> {
        let settings = self.settings.unwrap_or_default();
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpMediaFetcher::new(&settings.media)?),
        };
        Ok(GeminiAdaptor {
            settings: Arc::new(settings),
            fetcher,
            stream_handler: self.stream_handler,
        })
    }
}

#[async_trait]
impl RelayAdaptor for GeminiAdaptor {
    type Payload = VendorPayload;

    fn channel_name(&self) -> &str {
        CHANNEL_NAME
    }

    fn model_list(&self) -> &[&'static str] {
        MODEL_LIST
    }

    fn init(&self, info: &mut RelayInfo) {
        if info.directive.is_some() {
            return;
        }
        let directive =
            ModelDirective::parse(&info.upstream_model, self.settings.thinking_adapter_enabled);
        if !directive.is_plain() {
            debug!(
                origin = %info.origin_model,
                canonical = %directive.canonical_model_id,
                "decoded model directive"
            );
        }
        info.upstream_model = directive.canonical_model_id.clone();
        info.directive = Some(directive);
    }

    fn request_url(&self, info: &RelayInfo) -> Result<String> {
        let directive = self.directive(info)?;
        Ok(resolve_url(
            &info.base_url,
            &directive.canonical_model_id,
            info.is_stream,
            self.settings.as_ref(),
        ))
    }

    fn setup_request_headers(&self, info: &RelayInfo, headers: &mut HeaderMap) -> Result<()> {
        let key = HeaderValue::from_str(&info.api_key)
            .map_err(|_| Error::configuration("API key contains invalid header characters"))?;
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if info.is_stream {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }
        Ok(())
    }

    async fn convert_request(
        &self,
        info: &RelayInfo,
        request: &UnifiedRequest,
    ) -> Result<VendorPayload> {
        let directive = self.directive(info)?;
        let model = directive.canonical_model_id.as_str();
        let fetcher = self.fetcher.as_ref();

        let payload = match request {
            UnifiedRequest::Chat(chat) => VendorPayload::Chat(
                convert::chat_request(chat, directive, &self.settings, fetcher).await?,
            ),
            UnifiedRequest::Claude(claude) => VendorPayload::Chat(
                convert::claude_request(claude, directive, &self.settings, fetcher).await?,
            ),
            UnifiedRequest::Image(image) => {
                VendorPayload::Image(convert::image_request(image, model)?)
            }
            UnifiedRequest::Audio(audio) => VendorPayload::Chat(convert::audio_request(audio)?),
            UnifiedRequest::Embedding(embedding) => {
                VendorPayload::Embedding(convert::embedding_request(embedding, model)?)
            }
            UnifiedRequest::Responses(responses) => {
                VendorPayload::Chat(convert::responses_request(responses, fetcher).await?)
            }
            UnifiedRequest::Rerank(_) => {
                return Err(Error::unsupported_model(format!(
                    "rerank is not supported by {} ({})",
                    CHANNEL_NAME, model
                )));
            }
        };
        Ok(payload)
    }

    async fn dispatch_response(
        &self,
        response: UpstreamResponse,
        info: &RelayInfo,
        writer: &mut dyn ResponseWriter,
    ) -> std::result::Result<Dispatched, RelayError> {
        response::dispatch(response, info, self.stream_handler.as_deref(), writer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FetchedMedia;
    use crate::types::{ChatRequest, Message, RerankRequest};

    #[derive(Debug)]
    struct NoFetch;

    #[async_trait]
    impl MediaFetcher for NoFetch {
        async fn fetch(&self, _url: &str) -> Result<FetchedMedia> {
            Err(Error::decode("offline"))
        }
    }

    fn adaptor(thinking: bool) -> GeminiAdaptor {
        GeminiAdaptor::builder()
            .settings(GeminiSettings::default().with_thinking_adapter(thinking))
            .media_fetcher(Arc::new(NoFetch))
            .build()
            .unwrap()
    }

    fn chat_info(model: &str, stream: bool) -> (UnifiedRequest, RelayInfo) {
        let mut chat = ChatRequest::new(model, vec![Message::user("hi")]);
        chat.stream = stream;
        let request = UnifiedRequest::Chat(chat);
        let info = RelayInfo::for_request(&request, "https://g.local").with_api_key("k-123");
        (request, info)
    }

    #[test]
    fn test_init_rewrites_model_once() {
        let adaptor = adaptor(true);
        let (_, mut info) = chat_info("gemini-2.5-flash-thinking-512", false);
        adaptor.init(&mut info);
        assert_eq!(info.upstream_model, "gemini-2.5-flash");
        assert_eq!(info.origin_model, "gemini-2.5-flash-thinking-512");

        // a second init must not re-parse the rewritten id
        adaptor.init(&mut info);
        assert_eq!(info.directive.as_ref().unwrap().reasoning_budget, Some(512));
    }

    #[test]
    fn test_request_url_requires_init() {
        let adaptor = adaptor(true);
        let (_, mut info) = chat_info("gemini-2.5-flash-nothinking", true);
        assert!(matches!(
            adaptor.request_url(&info),
            Err(Error::Configuration { .. })
        ));
        adaptor.init(&mut info);
        assert_eq!(
            adaptor.request_url(&info).unwrap(),
            "https://g.local/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_headers() {
        let adaptor = adaptor(false);
        let (_, info) = chat_info("gemini-2.0-flash", true);
        let mut headers = HeaderMap::new();
        adaptor.setup_request_headers(&info, &mut headers).unwrap();
        assert_eq!(headers[API_KEY_HEADER], "k-123");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "text/event-stream");

        let (_, info) = chat_info("gemini-2.0-flash", false);
        let mut headers = HeaderMap::new();
        adaptor.setup_request_headers(&info, &mut headers).unwrap();
        assert!(headers.get(ACCEPT).is_none());
    }

    #[tokio::test]
    async fn test_convert_chat_to_body() {
        let adaptor = adaptor(true);
        let (request, mut info) = chat_info("gemini-2.5-flash-thinking", false);
        adaptor.init(&mut info);
        let body = adaptor.convert_request(&info, &request).await.unwrap().to_body().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            value["generationConfig"]["thinkingConfig"],
            serde_json::json!({"includeThoughts": true})
        );
    }

    #[tokio::test]
    async fn test_rerank_is_unsupported() {
        let adaptor = adaptor(false);
        let request = UnifiedRequest::Rerank(RerankRequest {
            model: "gemini-2.0-flash".into(),
            query: "q".into(),
            documents: vec![],
            top_n: None,
        });
        let mut info = RelayInfo::for_request(&request, "https://g.local");
        adaptor.init(&mut info);
        let err = adaptor.convert_request(&info, &request).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel { .. }));
    }

    #[test]
    fn test_adaptor_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<GeminiAdaptor>();
        assert!(adaptor(false).model_list().contains(&"text-embedding-004"));
    }
}
