//! Gemini response → unified response.
//!
//! Every handler consumes the upstream body. Successful handlers write the upstream
//! status, `application/json` and the translated body, and hand the same translated
//! value back to the caller; failures write nothing.

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::endpoint::ModelFamily;
use super::wire::{
    GeminiCandidate, GeminiChatResponse, GeminiEmbeddingResponse, GeminiErrorResponse,
    GeminiImageResponse, GeminiUsageMetadata,
};
use crate::drivers::{Dispatched, StreamHandler, StreamKind};
use crate::error::RelayError;
use crate::relay::{RelayInfo, RelayMode};
use crate::transport::{ResponseWriter, UpstreamResponse};
use crate::types::{
    ChatChoice, ChatCompletion, ChoiceMessage, Embedding, EmbeddingResponse, FunctionCall,
    ImageData, ImageResponse, ToolCall, UnifiedResponse, Usage,
};
use crate::Error;

/// Prompt tokens billed per generated image. Imagen reports no usage, so every
/// returned image counts as a fixed 258 tokens.
pub const IMAGE_TOKENS_PER_IMAGE: u64 = 258;

type HandlerResult = std::result::Result<Dispatched, RelayError>;

/// Route `response` to its handler: native passthrough, imagen, embedding, then chat.
pub async fn dispatch(
    response: UpstreamResponse,
    info: &RelayInfo,
    stream_handler: Option<&dyn StreamHandler>,
    writer: &mut dyn ResponseWriter,
) -> HandlerResult {
    if !response.is_success() {
        return Err(upstream_error(response).await);
    }

    if info.relay_mode == RelayMode::Gemini {
        return if info.is_stream {
            delegate_stream(StreamKind::Native, response, info, stream_handler, writer).await
        } else {
            native_handler(response, writer).await
        };
    }

    match ModelFamily::of(&info.upstream_model) {
        ModelFamily::Imagen => image_handler(response, writer).await,
        ModelFamily::Embedding => embedding_handler(response, info, writer).await,
        ModelFamily::Generative if info.is_stream => {
            delegate_stream(StreamKind::OpenAi, response, info, stream_handler, writer).await
        }
        ModelFamily::Generative => chat_handler(response, info, writer).await,
    }
}

async fn delegate_stream(
    kind: StreamKind,
    response: UpstreamResponse,
    info: &RelayInfo,
    stream_handler: Option<&dyn StreamHandler>,
    writer: &mut dyn ResponseWriter,
) -> HandlerResult {
    let Some(handler) = stream_handler else {
        drop(response);
        return Err(RelayError::internal(
            Error::configuration("streaming response but no stream handler is configured"),
            "stream_handler_missing",
        ));
    };
    debug!(?kind, model = %info.upstream_model, "delegating stream");
    let usage = handler.handle_stream(kind, response, info, writer).await?;
    Ok((None, usage))
}

pub async fn image_handler(
    response: UpstreamResponse,
    writer: &mut dyn ResponseWriter,
) -> HandlerResult {
    let status = response.status();
    let body = read_body(response).await?;
    let parsed: GeminiImageResponse = unmarshal(&body)?;

    let total = parsed.predictions.len();
    let data: Vec<ImageData> = parsed
        .predictions
        .into_iter()
        .filter(|p| {
            if p.rai_filtered_reason.is_empty() {
                return true;
            }
            warn!(reason = %p.rai_filtered_reason, "dropping filtered image");
            false
        })
        .map(|p| ImageData {
            url: None,
            b64_json: Some(p.bytes_base64_encoded),
            revised_prompt: None,
        })
        .collect();

    if data.is_empty() {
        return Err(RelayError::new(
            Error::empty_result(format!("no images generated ({} filtered)", total)),
            "no_images",
            400,
        ));
    }

    let images = data.len() as u64;
    let out = ImageResponse {
        created: chrono::Utc::now().timestamp(),
        data,
    };
    write_json(writer, status, &out)?;

    let usage = Usage::new(IMAGE_TOKENS_PER_IMAGE * images, 0);
    Ok((Some(UnifiedResponse::Image(out)), usage))
}

pub async fn embedding_handler(
    response: UpstreamResponse,
    info: &RelayInfo,
    writer: &mut dyn ResponseWriter,
) -> HandlerResult {
    let status = response.status();
    let body = read_body(response).await?;
    let parsed: GeminiEmbeddingResponse = unmarshal(&body)?;

    let usage = parsed
        .usage_metadata
        .map(|m| Usage::new(m.prompt_token_count, 0))
        .unwrap_or_default();
    let out = EmbeddingResponse {
        object: "list".to_string(),
        data: vec![Embedding::new(0, parsed.embedding.values)],
        model: info.origin_model.clone(),
        usage: usage.clone(),
    };
    write_json(writer, status, &out)?;

    Ok((Some(UnifiedResponse::Embedding(out)), usage))
}

pub async fn chat_handler(
    response: UpstreamResponse,
    info: &RelayInfo,
    writer: &mut dyn ResponseWriter,
) -> HandlerResult {
    let status = response.status();
    let body = read_body(response).await?;
    let parsed: GeminiChatResponse = unmarshal(&body)?;

    if parsed.candidates.is_empty() {
        let reason = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.get("blockReason"))
            .and_then(|r| r.as_str())
            .unwrap_or("no candidates returned");
        return Err(RelayError::from(Error::empty_result(reason.to_string())));
    }

    let usage = chat_usage(parsed.usage_metadata.unwrap_or_default());
    let choices = parsed
        .candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| to_choice(i as u32, c))
        .collect();
    let out = ChatCompletion {
        id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: info.origin_model.clone(),
        choices,
        usage: usage.clone(),
    };
    write_json(writer, status, &out)?;

    Ok((Some(UnifiedResponse::Chat(out)), usage))
}

/// Native passthrough: the body is forwarded unchanged, usage is read on the side.
pub async fn native_handler(
    response: UpstreamResponse,
    writer: &mut dyn ResponseWriter,
) -> HandlerResult {
    let status = response.status();
    let body = read_body(response).await?;
    let parsed: GeminiChatResponse = unmarshal(&body)?;
    let usage = chat_usage(parsed.usage_metadata.unwrap_or_default());

    writer.write_head(status, "application/json");
    writer.write_body(&body).map_err(write_failed)?;
    Ok((None, usage))
}

fn chat_usage(meta: GeminiUsageMetadata) -> Usage {
    Usage::new(
        meta.prompt_token_count,
        meta.candidates_token_count + meta.thoughts_token_count,
    )
    .with_reasoning_tokens(meta.thoughts_token_count)
}

fn to_choice(fallback_index: u32, candidate: GeminiCandidate) -> ChatChoice {
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();

    for part in candidate.content.parts {
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                id: format!("call_{}", Uuid::new_v4().simple()),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: call.name,
                    arguments: call.args.to_string(),
                },
            });
        } else if let Some(t) = part.text {
            if part.thought {
                reasoning.push_str(&t);
            } else {
                text.push_str(&t);
            }
        }
    }

    let reason = if tool_calls.is_empty() {
        candidate.finish_reason.as_deref().map(finish_reason)
    } else {
        Some("tool_calls".to_string())
    };

    ChatChoice {
        index: candidate.index.unwrap_or(fallback_index),
        message: ChoiceMessage {
            role: "assistant".to_string(),
            content: (!text.is_empty() || tool_calls.is_empty()).then_some(text),
            reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
            tool_calls,
        },
        finish_reason: reason,
    }
}

/// Gemini finish reason → OpenAI finish reason.
pub fn finish_reason(reason: &str) -> String {
    match reason {
        "STOP" => "stop".to_string(),
        "MAX_TOKENS" => "length".to_string(),
        "SAFETY" | "RECITATION" => "content_filter".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

async fn upstream_error(response: UpstreamResponse) -> RelayError {
    let status = response.status();
    let body = match read_body(response).await {
        Ok(body) => body,
        Err(e) => return e,
    };
    let detail = serde_json::from_slice::<GeminiErrorResponse>(&body)
        .map(|r| r.error)
        .unwrap_or_default();
    let message = if detail.message.is_empty() {
        String::from_utf8_lossy(&body).chars().take(512).collect()
    } else {
        detail.message
    };
    warn!(status, vendor_status = ?detail.status, "upstream returned an error");

    RelayError::from(Error::Upstream {
        status,
        vendor_status: detail.status,
        message,
    })
}

async fn read_body(response: UpstreamResponse) -> std::result::Result<Bytes, RelayError> {
    response
        .read_body()
        .await
        .map_err(|e| RelayError::internal(e, "read_response_body_failed"))
}

fn unmarshal<T: serde::de::DeserializeOwned>(body: &[u8]) -> std::result::Result<T, RelayError> {
    serde_json::from_slice(body).map_err(|e| {
        RelayError::internal(
            Error::decode(format!("invalid upstream body: {}", e)),
            "unmarshal_response_body_failed",
        )
    })
}

fn write_json<T: Serialize>(
    writer: &mut dyn ResponseWriter,
    status: u16,
    value: &T,
) -> std::result::Result<(), RelayError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| RelayError::internal(Error::Encode(e), "marshal_response_failed"))?;
    writer.write_head(status, "application/json");
    writer.write_body(&body).map_err(write_failed)
}

fn write_failed(e: std::io::Error) -> RelayError {
    RelayError::internal(Error::Io(e), "write_response_failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferedResponse;
    use serde_json::json;

    fn info(model: &str) -> RelayInfo {
        RelayInfo::new(RelayMode::ChatCompletions, "https://g.local", model)
    }

    fn upstream(value: serde_json::Value) -> UpstreamResponse {
        UpstreamResponse::from_bytes(200, serde_json::to_vec(&value).unwrap())
    }

    #[tokio::test]
    async fn test_image_usage_counts_survivors() {
        let mut out = BufferedResponse::default();
        let (response, usage) = image_handler(
            upstream(json!({"predictions": [
                {"bytesBase64Encoded": "AAA", "mimeType": "image/png"},
                {"raiFilteredReason": "unsafe"},
                {"bytesBase64Encoded": "BBB"}
            ]})),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(usage, Usage::new(2 * IMAGE_TOKENS_PER_IMAGE, 0));
        assert!(matches!(response, Some(UnifiedResponse::Image(ref r)) if r.data.len() == 2));
        assert_eq!(out.status(), Some(200));
        let body = out.json().unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][1]["b64_json"], "BBB");
    }

    #[tokio::test]
    async fn test_all_filtered_is_no_images() {
        let mut out = BufferedResponse::default();
        let err = image_handler(
            upstream(json!({"predictions": [{"raiFilteredReason": "unsafe"}]})),
            &mut out,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.code, "no_images");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_chat_thoughts_and_finish_reason() {
        let mut out = BufferedResponse::default();
        let (_, usage) = chat_handler(
            upstream(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "Hello"}, {"text": " world"}
                    ]},
                    "finishReason": "MAX_TOKENS"
                }],
                "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 7, "thoughtsTokenCount": 3}
            })),
            &info("gemini-2.5-flash"),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(usage.prompt_tokens, 5);
        assert_eq!(usage.completion_tokens, 10);
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.completion_tokens_details.unwrap().reasoning_tokens, 3);

        let body = out.json().unwrap();
        assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
        assert_eq!(body["choices"][0]["message"]["content"], "Hello world");
        assert_eq!(body["choices"][0]["message"]["reasoning_content"], "thinking...");
        assert_eq!(body["choices"][0]["finish_reason"], "length");
    }

    #[tokio::test]
    async fn test_chat_function_call() {
        let mut out = BufferedResponse::default();
        chat_handler(
            upstream(json!({"candidates": [{
                "content": {"parts": [{"functionCall": {"name": "lookup", "args": {"q": "rust"}}}]},
                "finishReason": "STOP"
            }]})),
            &info("gemini-2.0-flash"),
            &mut out,
        )
        .await
        .unwrap();
        let choice = &out.json().unwrap()["choices"][0];
        assert_eq!(choice["finish_reason"], "tool_calls");
        assert!(choice["message"]["content"].is_null());
        assert_eq!(choice["message"]["tool_calls"][0]["function"]["name"], "lookup");
        assert_eq!(
            choice["message"]["tool_calls"][0]["function"]["arguments"],
            r#"{"q":"rust"}"#
        );
    }

    #[tokio::test]
    async fn test_chat_without_candidates() {
        let mut out = BufferedResponse::default();
        let err = chat_handler(
            upstream(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
            &info("gemini-2.0-flash"),
            &mut out,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "upstream_empty_result");
        assert!(err.error.to_string().contains("SAFETY"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_body() {
        let mut out = BufferedResponse::default();
        let err = embedding_handler(
            UpstreamResponse::from_bytes(200, "not json"),
            &info("text-embedding-004"),
            &mut out,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, 500);
        assert_eq!(err.code, "unmarshal_response_body_failed");
    }

    #[tokio::test]
    async fn test_returned_response_matches_written_body() {
        let mut out = BufferedResponse::default();
        let (response, usage) = chat_handler(
            upstream(json!({
                "candidates": [{"content": {"parts": [{"text": "pong"}]}, "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 2, "candidatesTokenCount": 1}
            })),
            &info("gemini-2.0-flash"),
            &mut out,
        )
        .await
        .unwrap();

        let Some(UnifiedResponse::Chat(completion)) = response else {
            panic!("expected a chat completion");
        };
        assert_eq!(completion.usage, usage);
        assert_eq!(completion.choices[0].message.content.as_deref(), Some("pong"));
        assert_eq!(serde_json::to_value(&completion).unwrap(), out.json().unwrap());
    }

    #[tokio::test]
    async fn test_native_passthrough_has_no_translation() {
        let mut out = BufferedResponse::default();
        let (response, usage) = native_handler(
            upstream(json!({"usageMetadata": {"promptTokenCount": 1, "candidatesTokenCount": 1}})),
            &mut out,
        )
        .await
        .unwrap();
        assert!(response.is_none());
        assert_eq!(usage.total_tokens, 2);
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(finish_reason("STOP"), "stop");
        assert_eq!(finish_reason("MAX_TOKENS"), "length");
        assert_eq!(finish_reason("SAFETY"), "content_filter");
        assert_eq!(finish_reason("RECITATION"), "content_filter");
        assert_eq!(finish_reason("MALFORMED_FUNCTION_CALL"), "malformed_function_call");
    }
}
