//! Gemini wire shapes (`generateContent`, `predict`, `embedContent`).
//!
//! Request types serialize only what is set. Response types are lenient: every field
//! defaults, so partial upstream bodies still decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::FunctionDefinition;

// ---- generateContent ----

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiChatRequest {
    pub contents: Vec<GeminiChatContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiChatContent>,
    #[serde(skip_serializing_if = "GeminiChatGenerationConfig::is_empty")]
    pub generation_config: GeminiChatGenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiChatTool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeminiChatContent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    pub parts: Vec<Part>,
}

impl GeminiChatContent {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }

    /// Role-less content, as used by `systemInstruction` and `embedContent`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new("", vec![Part::text(text)])
    }
}

/// One request part. Exactly one key is emitted per part.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCallPart,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Part::FunctionCall {
            function_call: FunctionCallPart {
                name: name.into(),
                args,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallPart {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiChatGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<GeminiThinkingConfig>,
}

impl GeminiChatGenerationConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiThinkingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_thoughts: Option<bool>,
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiChatTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_declarations: Option<Vec<FunctionDefinition>>,
}

impl GeminiChatTool {
    /// Grounding with Google Search.
    pub fn google_search() -> Self {
        Self {
            google_search: Some(GoogleSearch {}),
            function_declarations: None,
        }
    }

    pub fn functions(declarations: Vec<FunctionDefinition>) -> Self {
        Self {
            google_search: None,
            function_declarations: Some(declarations),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeminiSafetySetting {
    pub category: String,
    pub threshold: String,
}

// ---- predict (imagen) ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiImageRequest {
    pub instances: Vec<GeminiImageInstance>,
    pub parameters: GeminiImageParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiImageInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiImageParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
    pub person_generation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiImageResponse {
    #[serde(default)]
    pub predictions: Vec<GeminiImagePrediction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiImagePrediction {
    pub mime_type: String,
    pub bytes_base64_encoded: String,
    pub rai_filtered_reason: String,
}

// ---- embedContent ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiEmbeddingRequest {
    pub content: GeminiChatContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimensionality: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiEmbeddingResponse {
    pub embedding: GeminiEmbeddingValues,
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiEmbeddingValues {
    pub values: Vec<f32>,
}

// ---- generateContent response ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiChatResponse {
    pub candidates: Vec<GeminiCandidate>,
    pub usage_metadata: Option<GeminiUsageMetadata>,
    pub prompt_feedback: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiCandidate {
    pub content: GeminiResponseContent,
    pub finish_reason: Option<String>,
    pub index: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiResponseContent {
    pub role: String,
    pub parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiResponsePart {
    pub text: Option<String>,
    /// Set on reasoning parts when `includeThoughts` was requested.
    pub thought: bool,
    pub function_call: Option<FunctionCallPart>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiUsageMetadata {
    pub prompt_token_count: u64,
    pub candidates_token_count: u64,
    pub thoughts_token_count: u64,
    pub total_token_count: u64,
}

// ---- errors ----

/// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiErrorResponse {
    #[serde(default)]
    pub error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeminiErrorDetail {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}
