//! The seam between the tool loop and a concrete model backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationMessage;
use crate::stream::StreamEvent;
use crate::tool::ToolDefinition;

/// Events of one model response, in arrival order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderError>> + Send>>;

/// Sampling controls sent with every turn of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: Option<f32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 4096,
            top_p: None,
        }
    }
}

/// A model backend that can be offered tools. Backends live in `krknai-llm`.
#[async_trait]
pub trait ToolAwareLlmProvider: Send + Sync {
    async fn stream_with_tools(
        &self,
        messages: Vec<ConversationMessage>,
        system_prompt: Option<String>,
        tools: Vec<ToolDefinition>,
        sampling: SamplingParams,
    ) -> Result<EventStream, ProviderError>;

    /// Short backend name used in log fields.
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("backend answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request did not complete: {0}")]
    Transport(String),
    #[error("unexpected response shape: {0}")]
    Malformed(String),
    #[error("rate limited, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("credentials rejected")]
    Unauthorized,
}

/// Scripted backend for driving the loop offline.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use futures::stream;

    use super::*;
    use crate::stream::StopReason;

    /// One request as the mock received it.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub messages: Vec<ConversationMessage>,
        pub system_prompt: Option<String>,
        pub tool_names: Vec<String>,
        pub sampling: SamplingParams,
    }

    /// Replays queued turns first in, first out. An empty queue answers with
    /// a bare end of turn.
    #[derive(Default)]
    pub struct MockLlmProvider {
        script: Mutex<VecDeque<Vec<StreamEvent>>>,
        seen: Mutex<Vec<RecordedRequest>>,
    }

    impl MockLlmProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue_response(&self, events: Vec<StreamEvent>) {
            self.script.lock().unwrap().push_back(events);
        }

        pub fn queue_text(&self, text: &str) {
            self.queue_response(vec![
                StreamEvent::TextDelta { text: text.into() },
                StreamEvent::MessageEnd { stop_reason: StopReason::EndTurn },
            ]);
        }

        /// A turn in which the model makes exactly one call.
        pub fn queue_tool_call(&self, id: &str, name: &str, input: serde_json::Value) {
            self.queue_response(vec![
                StreamEvent::ToolCallStart { id: id.into(), name: name.into() },
                StreamEvent::ToolCallDelta { id: id.into(), arguments_delta: input.to_string() },
                StreamEvent::ToolCallEnd { id: id.into() },
                StreamEvent::MessageEnd { stop_reason: StopReason::ToolUse },
            ]);
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolAwareLlmProvider for MockLlmProvider {
        async fn stream_with_tools(
            &self,
            messages: Vec<ConversationMessage>,
            system_prompt: Option<String>,
            tools: Vec<ToolDefinition>,
            sampling: SamplingParams,
        ) -> Result<EventStream, ProviderError> {
            let tool_names = tools.into_iter().map(|t| t.name).collect();
            self.seen.lock().unwrap().push(RecordedRequest {
                messages,
                system_prompt,
                tool_names,
                sampling,
            });

            let next = self.script.lock().unwrap().pop_front();
            let events = next.unwrap_or_else(|| {
                vec![StreamEvent::MessageEnd { stop_reason: StopReason::EndTurn }]
            });
            Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }
}
