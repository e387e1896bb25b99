pub mod conversation;
pub mod provider;
pub mod registry;
pub mod runtime;
pub mod stream;
pub mod tool;
pub mod tools;

pub use conversation::{AssistantContent, Conversation, ConversationMessage};
pub use provider::{EventStream, ProviderError, SamplingParams, ToolAwareLlmProvider};
pub use registry::{RegistryError, ToolRegistry};
pub use runtime::{LoopOutcome, ToolLoop, ToolLoopError, DEFAULT_MAX_ITERATIONS};
pub use stream::{StopReason, StreamEvent};
pub use tool::{Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolResult};
#[cfg(any(test, feature = "test-utils"))]
pub use tool::StaticTool;
pub use tools::{ReadFileTool, READ_FILE_TOOL};
