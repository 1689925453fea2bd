use crate::error_code::ErrorCode;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context: where in the request or response the failure was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path inside the unified request (e.g., "messages[1].content[0].image_url")
    pub field_path: Option<String>,
    /// Additional detail about the failure (e.g., the offending value, truncated)
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.field_path.is_none() && self.details.is_none()
    }
}

/// Unified error type for the Gemini relay.
///
/// Conversion-time variants (`UnsupportedModel`, `InvalidInput`, `Decode`) abort before
/// any upstream call. Response-time failures are wrapped in [`RelayError`] together with
/// the HTTP status the caller should surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported model: {message}{}", format_context(.context))]
    UnsupportedModel {
        message: String,
        context: ErrorContext,
    },

    #[error("Invalid input: {message}{}", format_context(.context))]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    #[error("Decode failure: {message}{}", format_context(.context))]
    Decode {
        message: String,
        context: ErrorContext,
    },

    #[error("Upstream returned no result: {message}")]
    EmptyResult { message: String },

    #[error("Encode failure: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Upstream error: HTTP {status}: {message}")]
    Upstream {
        status: u16,
        /// Vendor status string such as `INVALID_ARGUMENT`, when present.
        vendor_status: Option<String>,
        message: String,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    if ctx.is_empty() {
        return String::new();
    }
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    format!(" ({})", parts.join(", "))
}

impl Error {
    pub fn unsupported_model(msg: impl Into<String>) -> Self {
        Error::UnsupportedModel {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn decode_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Decode {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn empty_result(msg: impl Into<String>) -> Self {
        Error::EmptyResult {
            message: msg.into(),
        }
    }

    /// Attach a field path to errors that carry a context; other variants pass through.
    pub fn at_field(mut self, path: impl Into<String>) -> Self {
        if let Some(ctx) = self.context_mut() {
            let path = path.into();
            ctx.field_path = Some(match ctx.field_path.take() {
                Some(inner) if inner.starts_with('[') => format!("{}{}", path, inner),
                Some(inner) => format!("{}.{}", path, inner),
                None => path,
            });
        }
        self
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::UnsupportedModel { context, .. }
            | Error::InvalidInput { context, .. }
            | Error::Decode { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    fn context_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            Error::UnsupportedModel { context, .. }
            | Error::InvalidInput { context, .. }
            | Error::Decode { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Taxonomy code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::UnsupportedModel { .. } => ErrorCode::UnsupportedModel,
            Error::InvalidInput { .. } => ErrorCode::InvalidInput,
            Error::Decode { .. } => ErrorCode::DecodeFailure,
            Error::EmptyResult { .. } => ErrorCode::UpstreamEmptyResult,
            Error::Encode(_) => ErrorCode::EncodeFailure,
            Error::Upstream { .. } => ErrorCode::Upstream,
            Error::Configuration { .. } => ErrorCode::Configuration,
            Error::Transport(TransportError::Http(_)) | Error::Io(_) => ErrorCode::Transport,
            // Media fetch failures surface as decode failures of the content item.
            Error::Transport(_) => ErrorCode::DecodeFailure,
        }
    }

    /// HTTP status a caller should use when surfacing this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Upstream { status, .. } => *status,
            other => other.code().http_status(),
        }
    }

    /// Whether repeating the same request could succeed. Retrying is the caller's call.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Upstream { status, .. } => *status == 429 || *status >= 500,
            Error::Transport(TransportError::Http(e)) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// A response-time failure wrapped with the HTTP status and error code for the caller.
#[derive(Debug, Error)]
#[error("{code} (HTTP {status}): {error}")]
pub struct RelayError {
    pub status: u16,
    pub code: String,
    #[source]
    pub error: Error,
}

impl RelayError {
    pub fn new(error: Error, code: impl Into<String>, status: u16) -> Self {
        Self {
            status,
            code: code.into(),
            error,
        }
    }

    /// Wrap with the internal-error status (500).
    pub fn internal(error: Error, code: impl Into<String>) -> Self {
        Self::new(error, code, 500)
    }

    /// OpenAI-compatible error envelope: `{"error": {"message", "type", "code"}}`.
    pub fn to_openai_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": self.error.to_string(),
                "type": self.error.code().category(),
                "code": self.code,
            }
        })
    }
}

impl From<Error> for RelayError {
    fn from(error: Error) -> Self {
        let status = error.http_status();
        let code = error.code().name();
        Self::new(error, code, status)
    }
}
