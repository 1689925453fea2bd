//! Unified request → Gemini request conversion, one function per modality.

use serde_json::Value;
use tracing::debug;

use super::directive::ModelDirective;
use super::endpoint::ModelFamily;
use super::parts::{instruction_text, message_to_content};
use super::wire::{
    GeminiChatContent, GeminiChatGenerationConfig, GeminiChatRequest, GeminiChatTool,
    GeminiEmbeddingRequest, GeminiImageInstance, GeminiImageParameters, GeminiImageRequest,
    GeminiSafetySetting, GeminiThinkingConfig, Part,
};
use crate::config::GeminiSettings;
use crate::media::{decode_base64_file_data, MediaFetcher};
use crate::types::{
    AudioRequest, ChatRequest, ClaudeRequest, ClaudeThinking, ClaudeTool, EmbeddingRequest,
    FunctionDefinition, ImageRequest, Message, ResponseFormat, ResponsesRequest, ToolDefinition,
};
use crate::{Error, ErrorContext, Result};

/// The only embedding model that accepts `outputDimensionality`.
pub const OUTPUT_DIMENSIONALITY_MODEL: &str = "text-embedding-004";

const PERSON_GENERATION: &str = "allow_adult";

const HARM_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

pub async fn chat_request(
    request: &ChatRequest,
    directive: &ModelDirective,
    settings: &GeminiSettings,
    fetcher: &dyn MediaFetcher,
) -> Result<GeminiChatRequest> {
    let mut instructions = Vec::new();
    let mut contents = Vec::with_capacity(request.messages.len());

    for (idx, message) in request.messages.iter().enumerate() {
        if message.role.is_instruction() {
            match instruction_text(&message.content) {
                Some(text) => instructions.push(text),
                None => debug!(index = idx, "system message has no text; skipped"),
            }
            continue;
        }
        let content = message_to_content(message, fetcher)
            .await
            .map_err(|e| e.at_field(format!("messages[{}]", idx)))?;
        contents.push(content);
    }

    let mut generation_config = GeminiChatGenerationConfig {
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k,
        max_output_tokens: request.output_token_limit(),
        candidate_count: request.n.filter(|n| *n > 1),
        stop_sequences: request.stop.as_ref().map(|s| s.to_vec()).unwrap_or_default(),
        thinking_config: directive.thinking_config(),
        ..Default::default()
    };
    if let Some(format) = &request.response_format {
        apply_response_format(&mut generation_config, format);
    }

    Ok(GeminiChatRequest {
        contents,
        system_instruction: (!instructions.is_empty())
            .then(|| GeminiChatContent::text(instructions.join("\n\n"))),
        generation_config,
        tools: chat_tools(request.tools.as_deref().unwrap_or_default()),
        safety_settings: safety_settings(settings),
    })
}

/// Anthropic Messages → Gemini chat. A directive on the model name wins over the
/// request's own `thinking` block.
pub async fn claude_request(
    request: &ClaudeRequest,
    directive: &ModelDirective,
    settings: &GeminiSettings,
    fetcher: &dyn MediaFetcher,
) -> Result<GeminiChatRequest> {
    let mut contents = Vec::with_capacity(request.messages.len());
    for (idx, message) in request.messages.iter().enumerate() {
        let content = message_to_content(&message.to_message(), fetcher)
            .await
            .map_err(|e| e.at_field(format!("messages[{}]", idx)))?;
        contents.push(content);
    }

    let thinking_config = directive
        .thinking_config()
        .or_else(|| request.thinking.as_ref().and_then(claude_thinking));

    Ok(GeminiChatRequest {
        contents,
        system_instruction: request
            .system
            .as_ref()
            .and_then(|s| s.text())
            .map(GeminiChatContent::text),
        generation_config: GeminiChatGenerationConfig {
            temperature: request.temperature,
            top_p: request.top_p,
            top_k: request.top_k,
            max_output_tokens: request.max_tokens,
            stop_sequences: request.stop_sequences.clone(),
            thinking_config,
            ..Default::default()
        },
        tools: claude_tools(&request.tools),
        safety_settings: safety_settings(settings),
    })
}

fn claude_thinking(thinking: &ClaudeThinking) -> Option<GeminiThinkingConfig> {
    if !thinking.is_enabled() {
        return None;
    }
    Some(GeminiThinkingConfig {
        thinking_budget: thinking
            .budget_tokens
            .map(|b| u32::try_from(b).unwrap_or(u32::MAX)),
        include_thoughts: Some(true),
    })
}

fn claude_tools(tools: &[ClaudeTool]) -> Vec<GeminiChatTool> {
    let mut search = false;
    let mut declarations = Vec::new();
    for tool in tools {
        if tool.is_web_search() {
            search = true;
        } else if tool.input_schema.is_some() {
            declarations.push(FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            });
        } else {
            debug!(tool_type = ?tool.tool_type, name = %tool.name, "skipping unsupported tool");
        }
    }
    tool_entries(declarations, search)
}

fn apply_response_format(config: &mut GeminiChatGenerationConfig, format: &ResponseFormat) {
    match format.format_type.as_str() {
        "json_object" => config.response_mime_type = Some("application/json".to_string()),
        "json_schema" => {
            config.response_mime_type = Some("application/json".to_string());
            config.response_schema = format
                .json_schema
                .as_ref()
                .and_then(|s| s.get("schema"))
                .cloned();
        }
        _ => {}
    }
}

// Function declarations share one tool entry; search grounding gets its own.
fn chat_tools(tools: &[ToolDefinition]) -> Vec<GeminiChatTool> {
    let mut search = false;
    let mut declarations: Vec<FunctionDefinition> = Vec::new();

    for tool in tools {
        match (tool.tool_type.as_str(), &tool.function) {
            ("web_search" | "google_search", _) => search = true,
            ("function", Some(function)) => declarations.push(function.clone()),
            (other, _) => debug!(tool_type = %other, "skipping unsupported tool"),
        }
    }
    tool_entries(declarations, search)
}

fn tool_entries(declarations: Vec<FunctionDefinition>, search: bool) -> Vec<GeminiChatTool> {
    let mut out = Vec::new();
    if !declarations.is_empty() {
        out.push(GeminiChatTool::functions(declarations));
    }
    if search {
        out.push(GeminiChatTool::google_search());
    }
    out
}

fn safety_settings(settings: &GeminiSettings) -> Vec<GeminiSafetySetting> {
    let Some(threshold) = settings.safety_threshold.as_deref() else {
        return Vec::new();
    };
    HARM_CATEGORIES
        .iter()
        .map(|category| GeminiSafetySetting {
            category: category.to_string(),
            threshold: threshold.to_string(),
        })
        .collect()
}

pub fn image_request(request: &ImageRequest, model: &str) -> Result<GeminiImageRequest> {
    if ModelFamily::of(model) != ModelFamily::Imagen {
        return Err(Error::UnsupportedModel {
            message: "not supported model for image generation".to_string(),
            context: ErrorContext::new().with_details(model.to_string()),
        });
    }

    Ok(GeminiImageRequest {
        instances: vec![GeminiImageInstance {
            prompt: request.prompt.clone(),
        }],
        parameters: GeminiImageParameters {
            sample_count: request.n,
            aspect_ratio: aspect_ratio(&request.size).to_string(),
            person_generation: PERSON_GENERATION.to_string(),
        },
    })
}

/// OpenAI image size → Imagen aspect ratio. Unknown sizes are square.
pub fn aspect_ratio(size: &str) -> &'static str {
    match size {
        "1024x1792" => "9:16",
        "1792x1024" => "16:9",
        _ => "1:1",
    }
}

pub fn audio_request(request: &AudioRequest) -> Result<GeminiChatRequest> {
    let (mime_type, data) = decode_base64_file_data(&request.input).map_err(|e| {
        Error::decode_with_context(
            "decode base64 audio data failed",
            ErrorContext::new()
                .with_field_path("input")
                .with_details(e.to_string()),
        )
    })?;
    let format = mime_type.rsplit('/').next().unwrap_or(mime_type.as_str());

    Ok(GeminiChatRequest {
        contents: vec![GeminiChatContent::new(
            "user",
            vec![Part::inline(format!("audio/{}", format), data)],
        )],
        ..Default::default()
    })
}

/// Only the first input is embedded; `embedContent` takes a single content.
pub fn embedding_request(request: &EmbeddingRequest, model: &str) -> Result<GeminiEmbeddingRequest> {
    let input = request
        .input
        .as_ref()
        .ok_or_else(|| Error::invalid_input("input is required").at_field("input"))?;
    let mut inputs = input.parse().into_iter();
    let first = inputs
        .next()
        .ok_or_else(|| Error::invalid_input("input is empty").at_field("input"))?;
    let dropped = inputs.count();
    if dropped > 0 {
        debug!(dropped, "embedding request carries several inputs; only the first is sent");
    }

    let output_dimensionality = match request.dimensions {
        Some(dims) if dims > 0 && model == OUTPUT_DIMENSIONALITY_MODEL => Some(dims),
        _ => None,
    };

    Ok(GeminiEmbeddingRequest {
        content: GeminiChatContent::text(first),
        output_dimensionality,
    })
}

/// Best effort: undecodable instructions, input and tool schemas are skipped;
/// only content encoding errors abort.
pub async fn responses_request(
    request: &ResponsesRequest,
    fetcher: &dyn MediaFetcher,
) -> Result<GeminiChatRequest> {
    let system_instruction = match &request.instructions {
        Some(Value::String(text)) => Some(GeminiChatContent::text(text.clone())),
        Some(_) => {
            debug!("instructions is not a string; skipped");
            None
        }
        None => None,
    };

    let mut contents = Vec::new();
    for (idx, message) in input_messages(request.input.as_ref()).iter().enumerate() {
        let content = message_to_content(message, fetcher)
            .await
            .map_err(|e| e.at_field(format!("input[{}]", idx)))?;
        contents.push(content);
    }

    let mut tools = Vec::new();
    for tool in &request.tools {
        match tool.tool_type.as_str() {
            "web_search" => tools.push(GeminiChatTool::google_search()),
            "function" => match tool.function_definition() {
                Some(function) => tools.push(GeminiChatTool::functions(vec![function])),
                None => debug!("function tool schema could not be decoded; skipped"),
            },
            other => debug!(tool_type = %other, "skipping unsupported tool"),
        }
    }

    Ok(GeminiChatRequest {
        contents,
        system_instruction,
        generation_config: GeminiChatGenerationConfig {
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
            ..Default::default()
        },
        tools,
        safety_settings: Vec::new(),
    })
}

fn input_messages(input: Option<&Value>) -> Vec<Message> {
    match input {
        None => Vec::new(),
        Some(Value::String(text)) => vec![Message::user(text.clone())],
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            debug!(error = %e, "input is not a message list; skipped");
            Vec::new()
        }),
    }
}
