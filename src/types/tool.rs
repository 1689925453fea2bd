//! Tool calling definitions (OpenAI-compatible)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool declaration in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String, // "function", "web_search", ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDefinition>,
}

impl ToolDefinition {
    pub fn function(function: FunctionDefinition) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: Some(function),
        }
    }

    pub fn web_search() -> Self {
        Self {
            tool_type: "web_search".to_string(),
            function: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>, // JSON Schema
}

/// Tool declaration in a responses-style request.
///
/// The schema is kept as raw JSON: it is decoded per tool so that one malformed
/// declaration does not reject the whole request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Value>,
    /// Flat form: `{"type": "function", "name": .., "parameters": ..}`.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ResponsesTool {
    /// Decode the attached function schema, or `None` when it is absent or malformed.
    pub fn function_definition(&self) -> Option<FunctionDefinition> {
        let raw = match &self.function {
            Some(function) => function.clone(),
            None if !self.rest.is_empty() => Value::Object(self.rest.clone()),
            None => return None,
        };
        serde_json::from_value(raw).ok()
    }
}

/// Tool call emitted by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as in the OpenAI wire format.
    #[serde(default)]
    pub arguments: String,
}
