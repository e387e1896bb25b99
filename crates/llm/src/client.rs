use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use krknai_tool_runtime::{
    Conversation, ToolAwareLlmProvider, ToolCall, ToolContext, ToolLoop, ToolLoopError,
    ToolRegistry, DEFAULT_MAX_ITERATIONS,
};

use crate::params::ModelParams;

/// What the model returned for an analysis prompt.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    /// Tool calls in the order the model made them
    pub tool_calls: Vec<ToolCall>,
}

/// Sends a prompt to a model with a set of callable tools.
///
/// Implementations may run any number of tool rounds internally; callers only
/// see the final answer and the calls that were made.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn analyze(
        &self,
        prompt: &str,
        params: &ModelParams,
        tools: Arc<ToolRegistry>,
    ) -> Result<LlmResponse, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error(transparent)]
    Provider(#[from] krknai_tool_runtime::ProviderError),
    #[error("model kept calling tools after {0} rounds")]
    ToolLoopExhausted(usize),
    #[error("model returned an empty analysis")]
    EmptyResponse,
}

impl From<ToolLoopError> for LlmError {
    fn from(e: ToolLoopError) -> Self {
        match e {
            ToolLoopError::Provider(inner) => LlmError::Provider(inner),
            ToolLoopError::Exhausted(n) => LlmError::ToolLoopExhausted(n),
        }
    }
}

/// [`LlmClient`] that drives a [`ToolAwareLlmProvider`] through the tool loop.
pub struct ToolLoopClient {
    provider: Arc<dyn ToolAwareLlmProvider>,
    system_prompt: Option<String>,
    max_iterations: usize,
    working_directory: PathBuf,
    context_budget: usize,
}

impl ToolLoopClient {
    pub fn new(provider: Arc<dyn ToolAwareLlmProvider>) -> Self {
        Self {
            provider,
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            working_directory: PathBuf::from("."),
            context_budget: 200_000,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Directory relative tool paths resolve against.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }
}

#[async_trait]
impl LlmClient for ToolLoopClient {
    async fn analyze(
        &self,
        prompt: &str,
        params: &ModelParams,
        tools: Arc<ToolRegistry>,
    ) -> Result<LlmResponse, LlmError> {
        let mut conversation = Conversation::new(self.context_budget);
        if let Some(system) = &self.system_prompt {
            conversation = conversation.with_system_prompt(system.clone());
        }

        debug!(
            provider = self.provider.provider_name(),
            tools = tools.len(),
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            "starting analysis call"
        );

        let tool_loop = ToolLoop::new(self.provider.clone(), tools)
            .with_max_iterations(self.max_iterations)
            .with_sampling((*params).into());
        let context = ToolContext {
            working_directory: self.working_directory.clone(),
        };

        let outcome = tool_loop
            .run(&mut conversation, prompt.to_string(), &context)
            .await?;

        if outcome.text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!(
            iterations = outcome.iterations,
            tool_calls = outcome.tool_calls.len(),
            chars = outcome.text.len(),
            "analysis call complete"
        );

        Ok(LlmResponse {
            content: outcome.text,
            tool_calls: outcome.tool_calls,
        })
    }
}
