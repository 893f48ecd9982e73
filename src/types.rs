use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::DispatchError;

/// A function call the model asked for, in OpenAI wire shape:
/// `{"id": "...", "type": "function", "function": {"name": "...", "arguments": "<json>"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

/// Name plus the JSON-encoded arguments string, exactly as the model produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".into()
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Build a request from an Anthropic-style `tool_use` block, whose input
    /// is already a JSON object.
    pub fn from_tool_use(id: impl Into<String>, name: impl Into<String>, input: &Value) -> Self {
        Self::new(id, name, input.to_string())
    }

    /// Extract every tool call from an OpenAI assistant message.
    /// A message without `tool_calls` yields an empty list.
    pub fn from_assistant_message(message: &Value) -> Result<Vec<Self>, DispatchError> {
        let Some(calls) = message.get("tool_calls") else {
            return Ok(Vec::new());
        };
        if calls.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(calls.clone())
            .map_err(|e| DispatchError::MalformedRequest(e.to_string()))
    }

    pub fn tool_name(&self) -> &str {
        &self.function.name
    }

    pub fn arguments(&self) -> &str {
        &self.function.arguments
    }
}

/// A validated call, as handed to a handler.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    /// String argument by name, if present and a string.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Deserialize the argument object into a typed struct.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_value(Value::Object(self.arguments.clone()))
            .map_err(|e| format!("could not read arguments for {}: {e}", self.name))
    }
}

/// Outcome of one tool call, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
    pub completed_at: DateTime<Utc>,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: false,
            completed_at: Utc::now(),
        }
    }

    pub fn error(call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::success(call_id, name, content)
        }
    }

    /// OpenAI `tool` role message answering the originating call.
    pub fn to_openai_message(&self) -> Value {
        json!({
            "role": "tool",
            "tool_call_id": self.call_id,
            "content": self.content,
        })
    }

    /// Anthropic `tool_result` content block.
    pub fn to_anthropic_block(&self) -> Value {
        let mut block = json!({
            "type": "tool_result",
            "tool_use_id": self.call_id,
            "content": self.content,
        });
        if self.is_error {
            block["is_error"] = Value::Bool(true);
        }
        block
    }
}
