//! Tool-call normalization.
//!
//! Models ask for tools in one of three ways: a structured `tool_calls` list, a legacy
//! single `function_call` object, or a bare JSON object written into the text content.
//! [`normalize`] folds all three into one [`ToolRequest`].
//!
//! Parsing is best-effort: malformed JSON anywhere is treated as "no call" and the message
//! content becomes the final answer. It never returns an error.

use serde::Serialize;
use serde_json::{Map, Value};

pub type Arguments = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOrigin {
    Structured,
    Legacy,
    Inline,
}

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    /// First entry of a `tool_calls` list. `id` links the result turn back to the call.
    Structured {
        id: String,
        name: String,
        arguments: Arguments,
    },
    /// A `function_call` object.
    Legacy { name: String, arguments: Arguments },
    /// `{"name": .., "arguments"|"parameters": ..}` written as the message text.
    Inline { name: String, arguments: Arguments },
}

impl ToolRequest {
    pub fn name(&self) -> &str {
        match self {
            Self::Structured { name, .. } | Self::Legacy { name, .. } | Self::Inline { name, .. } => {
                name
            }
        }
    }

    pub fn arguments(&self) -> &Arguments {
        match self {
            Self::Structured { arguments, .. }
            | Self::Legacy { arguments, .. }
            | Self::Inline { arguments, .. } => arguments,
        }
    }

    pub fn origin(&self) -> ToolOrigin {
        match self {
            Self::Structured { .. } => ToolOrigin::Structured,
            Self::Legacy { .. } => ToolOrigin::Legacy,
            Self::Inline { .. } => ToolOrigin::Inline,
        }
    }
}

/// Outcome of executing a [`ToolRequest`]. `payload` is what the model sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub ok: bool,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(payload: Value) -> Self {
        Self {
            ok: true,
            payload,
            error: None,
        }
    }

    /// A failed call. `payload` should already carry the error for the model.
    pub fn failed(payload: Value, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload,
            error: Some(error.into()),
        }
    }

    /// Payload serialized for a conversation turn, cut to `max_bytes`.
    pub fn to_turn_content(&self, max_bytes: usize) -> String {
        let s = self.payload.to_string();
        crate::truncate::truncate_bytes(&s, max_bytes).to_string()
    }
}

/// Extracts at most one tool call from a chat-completion `message` object.
///
/// Priority (first match wins): `tool_calls[0]`, then `function_call`, then the text
/// content parsed as a JSON call object.
pub fn normalize(message: &Value) -> Option<ToolRequest> {
    if let Some(first) = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .and_then(|calls| calls.first())
    {
        let function = first.get("function")?;
        let name = call_name(function)?;
        let id = first
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("call_0")
            .to_string();
        return Some(ToolRequest::Structured {
            id,
            name,
            arguments: decode_arguments(function.get("arguments")),
        });
    }

    if let Some(function) = message.get("function_call").filter(|v| v.is_object()) {
        let name = call_name(function)?;
        return Some(ToolRequest::Legacy {
            name,
            arguments: decode_arguments(function.get("arguments")),
        });
    }

    let text = message.get("content").and_then(Value::as_str)?.trim();
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text) else {
        return None;
    };
    let name = obj.get("name").and_then(Value::as_str)?.to_string();
    let raw_args = obj.get("arguments").or_else(|| obj.get("parameters"))?;
    Some(ToolRequest::Inline {
        name,
        arguments: decode_arguments(Some(raw_args)),
    })
}

fn call_name(function: &Value) -> Option<String> {
    function
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Arguments arrive as an object or as a JSON-encoded string; anything else is empty.
fn decode_arguments(raw: Option<&Value>) -> Arguments {
    match raw {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => map,
            _ => Arguments::new(),
        },
        _ => Arguments::new(),
    }
}
