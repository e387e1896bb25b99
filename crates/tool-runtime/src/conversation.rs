use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Context budget used by [`Conversation::default`], in approximate tokens.
const DEFAULT_BUDGET_TOKENS: usize = 200_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConversationMessage {
    User(String),
    Assistant(AssistantContent),
    ToolResult(ToolResult),
}

impl ConversationMessage {
    /// Characters this message contributes to the request.
    fn weight(&self) -> usize {
        match self {
            Self::User(text) => text.len(),
            Self::Assistant(content) => {
                let text = content.text.as_deref().map_or(0, str::len);
                let calls: usize = content.tool_calls.iter().map(|c| c.input.to_string().len()).sum();
                text + calls
            }
            Self::ToolResult(result) => result.content.len(),
        }
    }
}

/// An assistant turn: text, tool calls, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantContent {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// History sent to the model on each turn of a tool loop.
///
/// Size is tracked as a running character count, four characters to a token.
/// Over budget, exchanges are evicted oldest first: an assistant turn goes
/// together with the tool results answering it. The opening prompt is always
/// kept.
pub struct Conversation {
    messages: Vec<ConversationMessage>,
    chars: usize,
    budget_tokens: usize,
    system_prompt: Option<String>,
}

impl Conversation {
    pub fn new(budget_tokens: usize) -> Self {
        Self {
            messages: Vec::new(),
            chars: 0,
            budget_tokens,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.push(ConversationMessage::User(text.into()));
    }

    pub fn add_assistant_response(&mut self, content: AssistantContent) {
        self.push(ConversationMessage::Assistant(content));
    }

    pub fn add_tool_result(&mut self, result: ToolResult) {
        self.push(ConversationMessage::ToolResult(result));
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn approximate_tokens(&self) -> usize {
        self.chars / 4
    }

    fn push(&mut self, message: ConversationMessage) {
        self.chars += message.weight();
        self.messages.push(message);

        while self.approximate_tokens() > self.budget_tokens && self.messages.len() > 3 {
            self.evict_oldest_exchange();
        }
    }

    /// Remove the oldest message after the opening prompt, then any tool
    /// results left without the assistant turn that requested them. Every
    /// result in the history must follow its call.
    fn evict_oldest_exchange(&mut self) {
        let evicted = self.messages.remove(1);
        self.chars -= evicted.weight();
        while matches!(self.messages.get(1), Some(ConversationMessage::ToolResult(_))) {
            let orphan = self.messages.remove(1);
            self.chars -= orphan.weight();
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET_TOKENS)
    }
}
