//! Unified message format (OpenAI-compatible chat messages)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::tool::ToolCall;

/// Unified message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_content(MessageRole::System, MessageContent::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_content(MessageRole::User, MessageContent::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_content(MessageRole::Assistant, MessageContent::Text(text.into()))
    }

    pub fn with_content(role: MessageRole, content: MessageContent) -> Self {
        Self {
            role,
            content,
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Message role. Roles without a dedicated variant are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
    Other(String),
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Other(role) => role,
        }
    }

    /// System-level instruction roles (`system`, and OpenAI's `developer`).
    pub fn is_instruction(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl From<String> for MessageRole {
    fn from(role: String) -> Self {
        match role.as_str() {
            "system" | "developer" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "tool" => Self::Tool,
            _ => Self::Other(role),
        }
    }
}

impl From<MessageRole> for String {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

/// Message content: plain text or a list of typed content items.
///
/// `Null` and `Other` keep shapes the encoder cannot map so that the conversion,
/// not deserialization, reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MessageContent {
    Text(String),
    Items(Vec<ContentItem>),
    #[default]
    Null,
    Other(Value),
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn items(items: Vec<ContentItem>) -> Self {
        MessageContent::Items(items)
    }
}

impl From<Value> for MessageContent {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => MessageContent::Text(text),
            Value::Array(items) => {
                MessageContent::Items(items.into_iter().map(ContentItem::from).collect())
            }
            Value::Null => MessageContent::Null,
            other => MessageContent::Other(other),
        }
    }
}

impl From<&MessageContent> for Value {
    fn from(content: &MessageContent) -> Self {
        match content {
            MessageContent::Text(text) => Value::String(text.clone()),
            MessageContent::Items(items) => {
                Value::Array(items.iter().map(ContentItem::to_value).collect())
            }
            MessageContent::Null => Value::Null,
            MessageContent::Other(value) => value.clone(),
        }
    }
}

impl Serialize for MessageContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(MessageContent::from)
    }
}

/// One typed item of a multi-part message, classified by its `type` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text {
        text: String,
    },
    ImageUrl {
        url: String,
        detail: Option<String>,
    },
    /// A known kind whose payload does not have the expected shape.
    Malformed {
        kind: String,
        payload: Value,
    },
    /// Any other kind (`input_audio`, `file`, ...), or an item that is not an object.
    Unrecognized {
        kind: String,
        payload: Value,
    },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentItem::ImageUrl {
            url: url.into(),
            detail: None,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ContentItem::Text { .. } => "text",
            ContentItem::ImageUrl { .. } => "image_url",
            ContentItem::Malformed { kind, .. } | ContentItem::Unrecognized { kind, .. } => kind,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ContentItem::Text { text } => serde_json::json!({ "type": "text", "text": text }),
            ContentItem::ImageUrl { url, detail } => {
                let mut image_url = serde_json::json!({ "url": url });
                if let Some(detail) = detail {
                    image_url["detail"] = Value::String(detail.clone());
                }
                serde_json::json!({ "type": "image_url", "image_url": image_url })
            }
            ContentItem::Malformed { payload, .. } | ContentItem::Unrecognized { payload, .. } => {
                payload.clone()
            }
        }
    }
}

impl From<Value> for ContentItem {
    fn from(payload: Value) -> Self {
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match kind.as_str() {
            "text" => match payload.get("text").and_then(Value::as_str) {
                Some(text) => ContentItem::text(text),
                None => ContentItem::Malformed { kind, payload },
            },
            "image_url" => {
                // Accept both `{"image_url": {"url": ..}}` and the flat `{"image_url": ".."}`.
                let image_url = payload.get("image_url");
                let url = image_url
                    .and_then(|v| v.get("url"))
                    .or(image_url)
                    .and_then(Value::as_str)
                    .map(String::from);
                match url {
                    Some(url) => ContentItem::ImageUrl {
                        url,
                        detail: image_url
                            .and_then(|v| v.get("detail"))
                            .and_then(Value::as_str)
                            .map(String::from),
                    },
                    None => ContentItem::Malformed { kind, payload },
                }
            }
            _ => ContentItem::Unrecognized { kind, payload },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_from_string_and_items() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "describe"},
                {"type": "image_url", "image_url": {"url": "https://x/y.png", "detail": "low"}},
                {"type": "input_audio", "input_audio": {"data": "..", "format": "wav"}},
                "stray"
            ]
        }))
        .unwrap();
        let MessageContent::Items(items) = &msg.content else {
            panic!("expected items");
        };
        assert_eq!(items[0], ContentItem::text("describe"));
        assert!(matches!(&items[1], ContentItem::ImageUrl { url, detail }
            if url == "https://x/y.png" && detail.as_deref() == Some("low")));
        assert_eq!(items[2].kind(), "input_audio");
        assert!(matches!(&items[3], ContentItem::Unrecognized { kind, .. } if kind.is_empty()));
    }

    #[test]
    fn test_malformed_known_kinds() {
        let item = ContentItem::from(json!({"type": "image_url", "image_url": {}}));
        assert!(matches!(item, ContentItem::Malformed { ref kind, .. } if kind == "image_url"));
        let item = ContentItem::from(json!({"type": "text", "text": 3}));
        assert!(matches!(item, ContentItem::Malformed { .. }));
    }

    #[test]
    fn test_role_pass_through() {
        let msg: Message =
            serde_json::from_value(json!({"role": "function", "content": "x"})).unwrap();
        assert_eq!(msg.role, MessageRole::Other("function".into()));
        assert_eq!(msg.role.as_str(), "function");

        let dev: Message =
            serde_json::from_value(json!({"role": "developer", "content": "x"})).unwrap();
        assert!(dev.role.is_instruction());
    }

    #[test]
    fn test_missing_and_object_content() {
        let msg: Message = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        assert_eq!(msg.content, MessageContent::Null);
        let msg: Message =
            serde_json::from_value(json!({"role": "user", "content": {"a": 1}})).unwrap();
        assert!(matches!(msg.content, MessageContent::Other(_)));
    }
}
