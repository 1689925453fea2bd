//! 类型系统模块：统一请求/响应模型（OpenAI 兼容）。
//!
//! # Types Module
//!
//! The provider-agnostic request and response model this relay presents to its callers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`UnifiedRequest`] | Request polymorphic over modality |
//! | [`Message`] | Chat message with role and content |
//! | [`ClaudeRequest`] | Anthropic Messages request, lowered into [`Message`]s |
//! | [`MessageContent`] | Plain text or typed content items |
//! | [`ToolDefinition`] | Tool declaration in a chat request |
//! | [`UnifiedResponse`] | Chat completion, image list or embedding |
//! | [`Usage`] | Token accounting attached to every response |

pub mod claude;
pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use claude::{
    ClaudeContent, ClaudeContentBlock, ClaudeImageSource, ClaudeMessage, ClaudeRequest, ClaudeThinking,
    ClaudeTool,
};
pub use message::{ContentItem, Message, MessageContent, MessageRole};
pub use request::{
    AudioRequest, ChatRequest, EmbeddingInput, EmbeddingRequest, ImageRequest, RerankRequest,
    ResponseFormat, ResponsesRequest, StopSequences, UnifiedRequest,
};
pub use response::{
    ChatChoice, ChatCompletion, ChoiceMessage, Embedding, EmbeddingResponse, ImageData,
    ImageResponse, UnifiedResponse, Usage,
};
pub use tool::{FunctionCall, FunctionDefinition, ResponsesTool, ToolCall, ToolDefinition};
