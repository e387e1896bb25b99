use serde::{Deserialize, Serialize};

/// Events emitted while a model response is produced.
/// Backend-agnostic; providers translate their wire format into these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A chunk of text from the assistant
    TextDelta { text: String },
    /// Start of a tool call
    ToolCallStart { id: String, name: String },
    /// Incremental JSON argument data for a tool call
    ToolCallDelta { id: String, arguments_delta: String },
    /// Tool call arguments are complete
    ToolCallEnd { id: String },
    /// The entire message is complete
    MessageEnd { stop_reason: StopReason },
    /// Non-fatal problem reported by the backend mid-response
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    /// Model wants to use tools
    ToolUse,
    MaxTokens,
    /// Blocked by the backend's safety filters
    Safety,
}
