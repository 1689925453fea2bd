//! Per-request relay context

use crate::drivers::gemini::ModelDirective;
use crate::types::UnifiedRequest;

/// How the caller reached the relay. `Gemini` is native passthrough: the caller speaks
/// the Gemini wire format and expects it back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    ChatCompletions,
    ClaudeMessages,
    Embeddings,
    ImageGenerations,
    AudioTranscription,
    Rerank,
    Responses,
    Gemini,
}

impl RelayMode {
    pub fn for_request(request: &UnifiedRequest) -> Self {
        match request {
            UnifiedRequest::Chat(_) => Self::ChatCompletions,
            UnifiedRequest::Claude(_) => Self::ClaudeMessages,
            UnifiedRequest::Image(_) => Self::ImageGenerations,
            UnifiedRequest::Audio(_) => Self::AudioTranscription,
            UnifiedRequest::Embedding(_) => Self::Embeddings,
            UnifiedRequest::Rerank(_) => Self::Rerank,
            UnifiedRequest::Responses(_) => Self::Responses,
        }
    }
}

/// Request-scoped relay state shared by URL resolution, conversion and dispatch.
#[derive(Debug, Clone)]
pub struct RelayInfo {
    pub relay_mode: RelayMode,
    pub base_url: String,
    /// Model name exactly as the caller sent it.
    pub origin_model: String,
    /// Effective model id; rewritten to the canonical id by the adaptor's `init`.
    pub upstream_model: String,
    pub is_stream: bool,
    pub api_key: String,
    /// Set once by `init`; `None` means the model has not been resolved yet.
    pub directive: Option<ModelDirective>,
}

impl RelayInfo {
    pub fn new(relay_mode: RelayMode, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            relay_mode,
            base_url: base_url.into(),
            origin_model: model.clone(),
            upstream_model: model,
            is_stream: false,
            api_key: String::new(),
            directive: None,
        }
    }

    pub fn for_request(request: &UnifiedRequest, base_url: impl Into<String>) -> Self {
        Self::new(RelayMode::for_request(request), base_url, request.model())
            .with_stream(request.is_stream())
    }

    pub fn with_stream(mut self, is_stream: bool) -> Self {
        self.is_stream = is_stream;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_relay_mode(mut self, relay_mode: RelayMode) -> Self {
        self.relay_mode = relay_mode;
        self
    }
}
