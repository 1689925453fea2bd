//! Message content → Gemini parts, shared by the chat and responses-style converters.

use serde_json::Value;
use tracing::debug;

use super::wire::{GeminiChatContent, Part};
use crate::media::{decode_base64_file_data, MediaFetcher};
use crate::types::{ContentItem, Message, MessageContent, MessageRole};
use crate::{Error, ErrorContext, Result};

/// Gemini role for a chat role. Only `assistant` is renamed.
pub fn gemini_role(role: &MessageRole) -> &str {
    match role {
        MessageRole::Assistant => "model",
        other => other.as_str(),
    }
}

/// Convert one message into a content entry.
///
/// Assistant tool calls become trailing `functionCall` parts; a message that only
/// carries tool calls may have null content.
pub async fn message_to_content(
    message: &Message,
    fetcher: &dyn MediaFetcher,
) -> Result<GeminiChatContent> {
    let mut parts = match (&message.content, message.has_tool_calls()) {
        (MessageContent::Null, true) => Vec::new(),
        (content, _) => content_to_parts(content, fetcher)
            .await
            .map_err(|e| e.at_field("content"))?,
    };

    for call in message.tool_calls.iter().flatten() {
        parts.push(Part::function_call(
            call.function.name.clone(),
            function_args(&call.function.arguments),
        ));
    }

    Ok(GeminiChatContent::new(gemini_role(&message.role), parts))
}

/// Convert message content into parts.
///
/// Text items and images are kept in order. Image URLs are tried as self-describing
/// payloads first and fetched remotely otherwise; any failure aborts the conversion.
/// Other item kinds are skipped.
pub async fn content_to_parts(
    content: &MessageContent,
    fetcher: &dyn MediaFetcher,
) -> Result<Vec<Part>> {
    let items = match content {
        MessageContent::Text(text) => return Ok(vec![Part::text(text.clone())]),
        MessageContent::Items(items) => items,
        MessageContent::Null | MessageContent::Other(_) => {
            return Err(Error::decode("unsupported message content format"));
        }
    };

    let mut parts = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match item {
            ContentItem::Text { text } => parts.push(Part::text(text.clone())),
            ContentItem::ImageUrl { url, .. } => {
                let part = image_part(url, fetcher)
                    .await
                    .map_err(|e| e.at_field(format!("[{}].image_url", idx)))?;
                parts.push(part);
            }
            ContentItem::Malformed { kind, .. } => {
                return Err(Error::decode_with_context(
                    format!("content item of type '{}' is malformed", kind),
                    ErrorContext::new().with_field_path(format!("[{}]", idx)),
                ));
            }
            ContentItem::Unrecognized { kind, .. } => {
                debug!(index = idx, kind = %kind, "skipping unsupported content item");
            }
        }
    }
    Ok(parts)
}

/// Plain text of an instruction message, ignoring non-text items.
pub fn instruction_text(content: &MessageContent) -> Option<String> {
    match content {
        MessageContent::Text(text) => Some(text.clone()),
        MessageContent::Items(items) => {
            let texts: Vec<&str> = items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect();
            (!texts.is_empty()).then(|| texts.join("\n"))
        }
        MessageContent::Null | MessageContent::Other(_) => None,
    }
}

async fn image_part(url: &str, fetcher: &dyn MediaFetcher) -> Result<Part> {
    match decode_base64_file_data(url) {
        Ok((mime_type, data)) => Ok(Part::inline(mime_type, data)),
        Err(_) => {
            let media = fetcher.fetch(url).await?;
            Ok(Part::inline(media.mime_type, media.base64_data))
        }
    }
}

/// Key under which non-object tool call arguments are wrapped.
const WRAPPED_ARGUMENTS_KEY: &str = "arguments";

// OpenAI carries arguments as a JSON string; Gemini only accepts an object.
fn function_args(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Default::default());
    }
    let value = match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => return Value::Object(map),
        Ok(other) => other,
        Err(_) => {
            debug!("tool call arguments are not valid JSON; wrapping raw text");
            Value::String(arguments.to_string())
        }
    };
    let mut wrapped = serde_json::Map::new();
    wrapped.insert(WRAPPED_ARGUMENTS_KEY.to_string(), value);
    Value::Object(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FetchedMedia;
    use crate::types::{FunctionCall, ToolCall};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

    #[derive(Debug, Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MediaFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedMedia> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::decode("unreachable host"));
            }
            Ok(FetchedMedia {
                mime_type: "image/jpeg".into(),
                base64_data: "/9j/".into(),
            })
        }
    }

    fn items(value: Value) -> MessageContent {
        MessageContent::from(value)
    }

    #[tokio::test]
    async fn test_text_content_is_single_part() {
        let fetcher = CountingFetcher::default();
        let parts = content_to_parts(&MessageContent::text("hi"), &fetcher).await.unwrap();
        assert_eq!(parts, vec![Part::text("hi")]);
    }

    #[tokio::test]
    async fn test_data_uri_skips_fetcher() {
        let fetcher = CountingFetcher::default();
        let content = items(json!([
            {"type": "text", "text": "what is this"},
            {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{}", PNG_B64)}}
        ]));
        let parts = content_to_parts(&content, &fetcher).await.unwrap();
        assert_eq!(parts[1], Part::inline("image/png", PNG_B64));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_url_uses_fetcher() {
        let fetcher = CountingFetcher::default();
        let content = items(json!([
            {"type": "image_url", "image_url": {"url": "https://example.com/cat.jpg"}}
        ]));
        let parts = content_to_parts(&content, &fetcher).await.unwrap();
        assert_eq!(parts, vec![Part::inline("image/jpeg", "/9j/")]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_with_field_path() {
        let fetcher = CountingFetcher {
            fail: true,
            ..Default::default()
        };
        let content = items(json!([
            {"type": "text", "text": "a"},
            {"type": "image_url", "image_url": {"url": "https://example.com/x"}}
        ]));
        let err = content_to_parts(&content, &fetcher).await.unwrap_err();
        assert_eq!(
            err.context().unwrap().field_path.as_deref(),
            Some("[1].image_url")
        );
    }

    #[tokio::test]
    async fn test_unknown_items_are_skipped() {
        let fetcher = CountingFetcher::default();
        let content = items(json!([
            {"type": "input_audio", "input_audio": {"data": "AAAA", "format": "wav"}},
            {"type": "text", "text": "kept"},
            "bare string"
        ]));
        let parts = content_to_parts(&content, &fetcher).await.unwrap();
        assert_eq!(parts, vec![Part::text("kept")]);
    }

    #[tokio::test]
    async fn test_non_list_content_is_rejected() {
        let fetcher = CountingFetcher::default();
        for content in [MessageContent::Null, items(json!({"text": "object"})), items(json!(42))] {
            let err = content_to_parts(&content, &fetcher).await.unwrap_err();
            assert!(err.to_string().contains("unsupported message content format"));
        }
    }

    #[tokio::test]
    async fn test_assistant_tool_calls_become_function_call_parts() {
        let fetcher = CountingFetcher::default();
        let mut message = Message::with_content(MessageRole::Assistant, MessageContent::Null);
        message.tool_calls = Some(vec![ToolCall {
            id: "call_1".into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: "get_weather".into(),
                arguments: r#"{"city":"Paris"}"#.into(),
            },
        }]);
        let content = message_to_content(&message, &fetcher).await.unwrap();
        assert_eq!(content.role, "model");
        assert_eq!(
            content.parts,
            vec![Part::function_call("get_weather", json!({"city": "Paris"}))]
        );
    }

    #[tokio::test]
    async fn test_malformed_item_aborts_with_index() {
        let fetcher = CountingFetcher::default();
        let cases = [
            json!([{"type": "text", "text": "a"}, {"type": "image_url", "image_url": {}}]),
            json!([{"type": "text", "text": "a"}, {"type": "text", "text": 3}]),
        ];
        for case in cases {
            let err = content_to_parts(&items(case), &fetcher).await.unwrap_err();
            assert!(matches!(err, Error::Decode { .. }), "unexpected error: {err:?}");
            assert_eq!(err.context().unwrap().field_path.as_deref(), Some("[1]"));
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_item_path_nests_under_content() {
        let fetcher = CountingFetcher::default();
        let message = Message::with_content(
            MessageRole::User,
            items(json!([{"type": "image_url", "image_url": {"detail": "low"}}])),
        );
        let err = message_to_content(&message, &fetcher).await.unwrap_err();
        assert_eq!(err.context().unwrap().field_path.as_deref(), Some("content[0]"));
    }

    #[test]
    fn test_function_args_are_always_objects() {
        assert_eq!(function_args(""), json!({}));
        assert_eq!(function_args(r#"{"q": 1}"#), json!({"q": 1}));
        assert_eq!(function_args("not json {"), json!({"arguments": "not json {"}));
        assert_eq!(function_args("[1, 2]"), json!({"arguments": [1, 2]}));
        assert_eq!(function_args("\"Paris\""), json!({"arguments": "Paris"}));
    }

    #[test]
    fn test_instruction_text() {
        assert_eq!(instruction_text(&MessageContent::text("be brief")).as_deref(), Some("be brief"));
        let content = items(json!([{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]));
        assert_eq!(instruction_text(&content).as_deref(), Some("a\nb"));
        assert_eq!(instruction_text(&MessageContent::Null), None);
    }
}
