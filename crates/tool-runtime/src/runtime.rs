//! Bounded model/tool exchange.
//!
//! Each iteration sends the conversation to the provider, drains the event
//! stream into a [`Turn`], runs any requested tools and appends their results.
//! The loop ends on the first turn without tool calls.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::conversation::{AssistantContent, Conversation};
use crate::provider::{EventStream, ProviderError, SamplingParams, ToolAwareLlmProvider};
use crate::registry::ToolRegistry;
use crate::stream::{StopReason, StreamEvent};
use crate::tool::{ToolCall, ToolContext, ToolResult};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

pub struct ToolLoop {
    provider: Arc<dyn ToolAwareLlmProvider>,
    registry: Arc<ToolRegistry>,
    max_iterations: usize,
    sampling: SamplingParams,
}

/// What one prompt produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Final assistant text
    pub text: String,
    /// Every call the model requested, in order, unregistered tools included
    pub tool_calls: Vec<ToolCall>,
    pub events: Vec<StreamEvent>,
    pub iterations: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolLoopError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("model still calling tools after {0} iterations")]
    Exhausted(usize),
}

/// One assistant response, assembled from its stream.
#[derive(Debug, Default)]
struct Turn {
    text: String,
    tool_calls: Vec<ToolCall>,
    stop_reason: Option<StopReason>,
    events: Vec<StreamEvent>,
}

impl ToolLoop {
    pub fn new(provider: Arc<dyn ToolAwareLlmProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            sampling: SamplingParams::default(),
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub async fn run(
        &self,
        conversation: &mut Conversation,
        prompt: String,
        context: &ToolContext,
    ) -> Result<LoopOutcome, ToolLoopError> {
        conversation.add_user_message(prompt);
        let declarations = self.registry.definitions();
        let mut events = Vec::new();
        let mut requested = Vec::new();

        for iteration in 1..=self.max_iterations {
            debug!(iteration, provider = self.provider.provider_name(), "model turn");

            let stream = self
                .provider
                .stream_with_tools(
                    conversation.messages().to_vec(),
                    conversation.system_prompt().map(String::from),
                    declarations.clone(),
                    self.sampling,
                )
                .await?;
            let turn = read_turn(stream).await?;
            events.extend(turn.events);

            conversation.add_assistant_response(AssistantContent {
                text: (!turn.text.is_empty()).then(|| turn.text.clone()),
                tool_calls: turn.tool_calls.clone(),
            });

            if turn.tool_calls.is_empty() {
                match turn.stop_reason {
                    Some(StopReason::EndTurn) | None => {}
                    Some(reason) => warn!(?reason, "model stopped before finishing"),
                }
                info!(iterations = iteration, tool_calls = requested.len(), "tool loop finished");
                return Ok(LoopOutcome {
                    text: turn.text,
                    tool_calls: requested,
                    events,
                    iterations: iteration,
                });
            }

            for call in &turn.tool_calls {
                let result = self.dispatch(call, context).await;
                conversation.add_tool_result(result);
            }
            requested.extend(turn.tool_calls);
        }

        Err(ToolLoopError::Exhausted(self.max_iterations))
    }

    async fn dispatch(&self, call: &ToolCall, context: &ToolContext) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "model called an unregistered tool");
            return ToolResult::error_for(call, format!("Unknown tool: {}", call.name));
        };

        debug!(tool = %call.name, id = %call.id, "running tool");
        match tool.execute(call.input.clone(), context).await {
            Ok(result) => result.answering(call),
            Err(e) => {
                debug!(tool = %call.name, error = %e, "tool returned an error");
                ToolResult::error_for(call, format!("Tool error: {e}"))
            }
        }
    }
}

/// Drain a provider stream. Argument fragments are matched to their call
/// by id, so interleaved calls assemble correctly.
async fn read_turn(mut stream: EventStream) -> Result<Turn, ProviderError> {
    let mut turn = Turn::default();
    // (id, name, argument buffer), in start order
    let mut open: Vec<(String, String, String)> = Vec::new();

    while let Some(event) = stream.next().await {
        let event = event?;
        match &event {
            StreamEvent::TextDelta { text } => turn.text.push_str(text),
            StreamEvent::ToolCallStart { id, name } => {
                open.push((id.clone(), name.clone(), String::new()));
            }
            StreamEvent::ToolCallDelta { id, arguments_delta } => {
                match open.iter_mut().find(|(open_id, _, _)| open_id == id) {
                    Some((_, _, args)) => args.push_str(arguments_delta),
                    None => warn!(%id, "arguments for a call that was never started"),
                }
            }
            StreamEvent::ToolCallEnd { id } => {
                if let Some(pos) = open.iter().position(|(open_id, _, _)| open_id == id) {
                    let (id, name, args) = open.remove(pos);
                    let input = parse_arguments(&name, &args);
                    turn.tool_calls.push(ToolCall { id, name, input });
                }
            }
            StreamEvent::MessageEnd { stop_reason } => turn.stop_reason = Some(stop_reason.clone()),
            StreamEvent::Error { message } => warn!(message, "provider reported a stream error"),
        }
        turn.events.push(event);
    }

    for (id, name, _) in &open {
        warn!(%id, tool = %name, "tool call never completed, dropping");
    }
    Ok(turn)
}

fn parse_arguments(tool: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(tool, error = %e, "unparseable tool arguments");
        Value::Null
    })
}
