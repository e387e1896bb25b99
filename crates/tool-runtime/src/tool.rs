use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function the model may call, as declared to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Matches the call to its [`ToolResult`]
    pub id: String,
    pub name: String,
    /// Arguments object; `Null` when the model sent unparseable JSON
    pub input: Value,
}

/// Output of one call, fed back to the model on the next turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    /// Function-calling APIs key responses by name rather than by call id.
    pub tool_name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Successful output; the runtime fills in the call id and name.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tool_call_id: String::new(),
            tool_name: String::new(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Error output attributed to `call`.
    pub fn error_for(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Attribute this result to `call`.
    pub fn answering(mut self, call: &ToolCall) -> Self {
        self.tool_call_id = call.id.clone();
        self.tool_name = call.name.clone();
        self
    }
}

#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Relative paths in tool arguments resolve against this
    pub working_directory: PathBuf,
}

/// A capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("access denied: {0}")]
    PermissionDenied(String),
}

/// Tool that ignores its arguments and always returns the same text.
#[cfg(any(test, feature = "test-utils"))]
pub struct StaticTool {
    name: String,
    reply: String,
}

#[cfg(any(test, feature = "test-utils"))]
impl StaticTool {
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Tool for StaticTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name.clone(),
            "Returns a fixed reply.",
            serde_json::json!({ "type": "object", "properties": {} }),
        )
    }

    async fn execute(&self, _input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(self.reply.clone()))
    }
}
