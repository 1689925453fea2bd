//! # gemini-relay
//!
//! 统一请求模型与 Google Gemini 线协议之间的适配层。
//!
//! Protocol adaptor between a provider-agnostic (OpenAI-compatible) request model and
//! the Google Gemini wire format.
//!
//! ## Overview
//!
//! The adaptor takes a [`UnifiedRequest`] (chat, Claude messages, image, audio,
//! embedding, rerank or responses-style), decodes the feature flags hidden in the model name once, resolves
//! the upstream endpoint, and converts the request into the Gemini payload. On the way
//! back it selects a response handler by modality and delivery mode, writes the
//! translated body to the caller's [`ResponseWriter`] and returns the
//! [`UnifiedResponse`] it wrote together with a [`Usage`] record.
//!
//! Transport, authentication key selection, retries and incremental stream parsing are
//! owned by the caller; this crate only names the collaborators it needs
//! ([`MediaFetcher`], [`StreamHandler`], [`ResponseWriter`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gemini_relay::{
//!     BufferedResponse, GeminiAdaptor, GeminiSettings, RelayAdaptor, RelayInfo,
//!     UnifiedRequest, UpstreamResponse,
//! };
//!
//! # async fn run(raw: UpstreamResponse) -> Result<(), Box<dyn std::error::Error>> {
//! let adaptor = GeminiAdaptor::builder()
//!     .settings(GeminiSettings::default().with_env_overrides())
//!     .build()?;
//!
//! let request: UnifiedRequest = UnifiedRequest::Chat(serde_json::from_str(
//!     r#"{"model":"gemini-2.5-flash-thinking-1024","messages":[{"role":"user","content":"hi"}]}"#,
//! )?);
//!
//! let mut info = RelayInfo::for_request(&request, "https://generativelanguage.googleapis.com");
//! adaptor.init(&mut info);
//! let url = adaptor.request_url(&info)?;
//! let body = adaptor.convert_request(&info, &request).await?.to_body()?;
//! // ... send `body` to `url`, then hand the raw response back:
//! let mut out = BufferedResponse::default();
//! let (response, usage) = adaptor.dispatch_response(raw, &info, &mut out).await?;
//! # let _ = (url, body, response, usage);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`drivers`] | Adaptor trait and the Gemini implementation |
//! | [`types`] | Unified request/response model |
//! | [`relay`] | Per-request relay context |
//! | [`media`] | Self-describing payload decoding and remote media fetching |
//! | [`transport`] | Upstream response and outbound writer abstractions |
//! | [`config`] | Adaptor settings (YAML + environment) |

pub mod config;
pub mod drivers;
pub mod error_code;
pub mod media;
pub mod relay;
pub mod transport;
pub mod types;

pub use config::{GeminiSettings, MediaSettings};
pub use drivers::gemini::{
    GeminiAdaptor, GeminiAdaptorBuilder, ModelDirective, ReasoningMode, VendorPayload,
    IMAGE_TOKENS_PER_IMAGE,
};
pub use drivers::{Dispatched, RelayAdaptor, StreamHandler, StreamKind};
pub use media::{FetchedMedia, MediaFetcher};
pub use relay::{RelayInfo, RelayMode};
pub use transport::{BufferedResponse, ResponseWriter, UpstreamResponse};
pub use types::{UnifiedRequest, UnifiedResponse, Usage};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, RelayError};
