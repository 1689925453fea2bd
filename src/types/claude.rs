//! Anthropic Messages request shape.
//!
//! Callers speaking the Claude Messages API are relayed to Gemini as chat. Each message
//! is lowered into a unified [`Message`] so it shares the chat content encoder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::message::{ContentItem, Message, MessageContent, MessageRole};
use super::tool::{FunctionCall, ToolCall};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub messages: Vec<ClaudeMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<ClaudeContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ClaudeTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ClaudeThinking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: MessageRole,
    pub content: ClaudeContent,
}

/// `"content": "..."` or `"content": [{"type": ..}, ..]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaudeContent {
    Text(String),
    Blocks(Vec<ClaudeContentBlock>),
}

impl ClaudeContent {
    /// Text blocks joined by newlines; `None` when there is no text at all.
    pub fn text(&self) -> Option<String> {
        match self {
            ClaudeContent::Text(text) => Some(text.clone()),
            ClaudeContent::Blocks(blocks) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| match block {
                        ClaudeContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                (!texts.is_empty()).then(|| texts.join("\n"))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ClaudeImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
    },
    /// `thinking`, `document`, and any block type added later.
    #[serde(other)]
    Unsupported,
}

/// `{"type": "base64", "media_type": .., "data": ..}` or `{"type": "url", "url": ..}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ClaudeImageSource {
    /// The source as an image URL: a data URI for inline bytes, the URL otherwise.
    pub fn to_url(&self) -> Option<String> {
        match (self.source_type.as_str(), &self.data, &self.url) {
            ("base64", Some(data), _) => Some(format!(
                "data:{};base64,{}",
                self.media_type.as_deref().unwrap_or("image/png"),
                data
            )),
            ("url", _, Some(url)) => Some(url.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeTool {
    /// Absent for custom tools; set for server tools such as `web_search_20250305`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ClaudeTool {
    pub fn is_web_search(&self) -> bool {
        self.tool_type
            .as_deref()
            .is_some_and(|t| t.starts_with("web_search"))
    }
}

/// `{"type": "enabled", "budget_tokens": 1024}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeThinking {
    #[serde(rename = "type")]
    pub thinking_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_tokens: Option<u64>,
}

impl ClaudeThinking {
    pub fn is_enabled(&self) -> bool {
        self.thinking_type == "enabled"
    }
}

impl ClaudeMessage {
    /// Lower into a unified message.
    ///
    /// `tool_use` blocks become tool calls and `tool_result` blocks become text,
    /// matching how chat callers send tool output. Image sources without usable
    /// bytes or URL are kept as malformed items so the encoder rejects them.
    pub fn to_message(&self) -> Message {
        let blocks = match &self.content {
            ClaudeContent::Text(text) => {
                return Message::with_content(self.role.clone(), MessageContent::text(text.clone()))
            }
            ClaudeContent::Blocks(blocks) => blocks,
        };

        let mut items = Vec::with_capacity(blocks.len());
        let mut tool_calls = Vec::new();
        for block in blocks {
            match block {
                ClaudeContentBlock::Text { text } => items.push(ContentItem::text(text.clone())),
                ClaudeContentBlock::Image { source } => items.push(match source.to_url() {
                    Some(url) => ContentItem::image_url(url),
                    None => ContentItem::Malformed {
                        kind: "image".to_string(),
                        payload: serde_json::to_value(source).unwrap_or_default(),
                    },
                }),
                ClaudeContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id: id.clone(),
                    call_type: "function".to_string(),
                    function: FunctionCall {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                }),
                ClaudeContentBlock::ToolResult { content, .. } => {
                    items.push(ContentItem::text(tool_result_text(content)))
                }
                ClaudeContentBlock::Unsupported => debug!("skipping unsupported content block"),
            }
        }

        let content = if items.is_empty() && !tool_calls.is_empty() {
            MessageContent::Null
        } else {
            MessageContent::items(items)
        };
        let mut message = Message::with_content(self.role.clone(), content);
        message.tool_calls = (!tool_calls.is_empty()).then_some(tool_calls);
        message
    }
}

fn tool_result_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
