//! OpenAI-compatible chat-completions wire types.
//!
//! Responses are kept as raw `serde_json::Value` messages: local model servers disagree on
//! the exact shape of tool calls, and [`crate::normalize`] is the one place that reads them.

use crate::calls::ToolRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Result of a structured (`tool_calls`) call.
    Tool,
    /// Result of a legacy or inline call.
    Function,
}

/// One role-tagged message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Turn {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            function_call: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// The assistant turn that requested `call`, re-encoded in the convention it arrived in.
    ///
    /// Only the acted-on call is echoed back; servers reject histories that contain
    /// structured calls without a matching tool result.
    pub fn assistant_call(call: &ToolRequest, content: Option<&str>) -> Self {
        let arguments = Value::Object(call.arguments().clone()).to_string();
        let mut turn = Self {
            role: Role::Assistant,
            content: content.map(str::to_string),
            tool_calls: None,
            function_call: None,
            tool_call_id: None,
            name: None,
        };
        match call {
            ToolRequest::Structured { id, name, .. } => {
                turn.tool_calls = Some(vec![serde_json::json!({
                    "id": id,
                    "type": "function",
                    "function": { "name": name, "arguments": arguments },
                })]);
            }
            ToolRequest::Legacy { name, .. } => {
                turn.function_call = Some(serde_json::json!({
                    "name": name,
                    "arguments": arguments,
                }));
            }
            ToolRequest::Inline { name, arguments } => {
                if turn.content.is_none() {
                    turn.content = Some(
                        serde_json::json!({ "name": name, "arguments": arguments }).to_string(),
                    );
                }
            }
        }
        turn
    }

    /// The turn carrying a tool's output back to the model.
    pub fn tool_result(call: &ToolRequest, content: impl Into<String>) -> Self {
        let mut turn = match call {
            ToolRequest::Structured { id, .. } => {
                let mut t = Self::plain(Role::Tool, content);
                t.tool_call_id = Some(id.clone());
                t
            }
            ToolRequest::Legacy { .. } | ToolRequest::Inline { .. } => {
                Self::plain(Role::Function, content)
            }
        };
        turn.name = Some(call.name().to_string());
        turn
    }
}

/// A callable tool, declarable in both the modern and the legacy convention.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl ToolSpec {
    /// Entry for the `tools` array.
    pub fn as_tool(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": self.as_function(),
        })
    }

    /// Entry for the legacy `functions` array.
    pub fn as_function(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Turn>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            functions: Vec::new(),
            tool_choice: None,
            function_call: None,
            stream: Some(false),
        }
    }

    /// Declares `specs` as both `tools` and `functions`, letting the model choose.
    pub fn with_tools(mut self, specs: &[ToolSpec]) -> Self {
        self.tools = specs.iter().map(ToolSpec::as_tool).collect();
        self.functions = specs.iter().map(ToolSpec::as_function).collect();
        self.tool_choice = Some("auto".to_string());
        self.function_call = Some("auto".to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Value,
}

impl ChatResponse {
    /// The first choice's message, or `Value::Null` when the server sent none.
    pub fn into_message(self) -> Value {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .unwrap_or(Value::Null)
    }
}

/// The text content of a response message, if it has any.
pub fn message_content(message: &Value) -> Option<&str> {
    message.get("content").and_then(Value::as_str)
}
