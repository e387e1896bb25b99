pub mod gemini;

use std::sync::Arc;

use krknai_core::config::LlmSettings;

use crate::client::{LlmError, ToolLoopClient};

/// Instructions sent as the system prompt on every analysis call.
const ANALYST_SYSTEM_PROMPT: &str = "You are a site reliability engineer reviewing the results of an \
automated chaos engineering run. Use the read_file tool to inspect scenario logs when the \
statistics alone do not explain a failure. Answer in Markdown.";

/// Create the analysis client configured by `settings`.
pub fn create_client(settings: &LlmSettings) -> Result<ToolLoopClient, LlmError> {
    let provider = gemini::GeminiToolProvider::from_settings(settings)?;
    Ok(ToolLoopClient::new(Arc::new(provider))
        .with_system_prompt(ANALYST_SYSTEM_PROMPT)
        .with_max_iterations(settings.max_tool_iterations))
}
