//! Translation between conversation types and the Gemini `generateContent` format.

use serde_json::{json, Value};

use krknai_tool_runtime::{
    ConversationMessage, ProviderError, SamplingParams, StopReason, StreamEvent, ToolDefinition,
};

/// Translate tool definitions into a single Gemini `tools` entry.
pub(super) fn tools_to_gemini(tools: &[ToolDefinition]) -> Value {
    let declarations: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.input_schema,
            })
        })
        .collect();
    json!([{ "functionDeclarations": declarations }])
}

/// Translate the conversation into Gemini `contents`.
///
/// Consecutive tool results are folded into one `user` turn so each model
/// turn's function calls are answered together.
pub(super) fn messages_to_gemini(messages: &[ConversationMessage]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::new();
    let mut pending_responses: Vec<Value> = Vec::new();

    for msg in messages {
        if let ConversationMessage::ToolResult(result) = msg {
            let key = if result.is_error { "error" } else { "content" };
            pending_responses.push(json!({
                "functionResponse": {
                    "name": result.tool_name,
                    "response": { key: result.content },
                }
            }));
            continue;
        }

        if !pending_responses.is_empty() {
            contents.push(json!({ "role": "user", "parts": std::mem::take(&mut pending_responses) }));
        }

        match msg {
            ConversationMessage::User(text) => {
                contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));
            }
            ConversationMessage::Assistant(content) => {
                let mut parts: Vec<Value> = Vec::new();
                if let Some(text) = &content.text {
                    parts.push(json!({ "text": text }));
                }
                for call in &content.tool_calls {
                    parts.push(json!({
                        "functionCall": { "name": call.name, "args": call.input }
                    }));
                }
                if !parts.is_empty() {
                    contents.push(json!({ "role": "model", "parts": parts }));
                }
            }
            ConversationMessage::ToolResult(_) => {}
        }
    }

    if !pending_responses.is_empty() {
        contents.push(json!({ "role": "user", "parts": pending_responses }));
    }

    contents
}

/// Build the full request body.
pub(super) fn build_request_body(
    messages: &[ConversationMessage],
    system_prompt: Option<&str>,
    tools: &[ToolDefinition],
    sampling: &SamplingParams,
) -> Value {
    let mut generation_config = json!({
        "temperature": sampling.temperature,
        "maxOutputTokens": sampling.max_tokens,
    });
    if let Some(top_p) = sampling.top_p {
        generation_config["topP"] = json!(top_p);
    }

    let mut body = json!({
        "contents": messages_to_gemini(messages),
        "generationConfig": generation_config,
    });

    if !tools.is_empty() {
        body["tools"] = tools_to_gemini(tools);
    }

    if let Some(system) = system_prompt {
        body["system_instruction"] = json!({ "parts": [{ "text": system }] });
    }

    body
}

/// Turn a `generateContent` response into stream events.
///
/// Gemini has no call ids, so `next_id` supplies one per function call.
pub(super) fn parse_response(
    resp: &Value,
    mut next_id: impl FnMut() -> String,
) -> Result<Vec<StreamEvent>, ProviderError> {
    let candidate = match resp["candidates"].get(0) {
        Some(c) => c,
        None => {
            let reason = resp["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            return Err(ProviderError::Malformed(format!("prompt rejected: {reason}")));
        }
    };

    let mut events = Vec::new();
    let mut saw_call = false;

    if let Some(parts) = candidate["content"]["parts"].as_array() {
        for part in parts {
            if let Some(text) = part["text"].as_str() {
                // thought summaries are not part of the answer
                if part["thought"].as_bool() != Some(true) && !text.is_empty() {
                    events.push(StreamEvent::TextDelta { text: text.to_string() });
                }
            } else if let Some(call) = part.get("functionCall") {
                let name = call["name"]
                    .as_str()
                    .ok_or_else(|| ProviderError::Malformed("functionCall without name".into()))?;
                let id = next_id();
                let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                events.push(StreamEvent::ToolCallStart { id: id.clone(), name: name.to_string() });
                events.push(StreamEvent::ToolCallDelta {
                    id: id.clone(),
                    arguments_delta: args.to_string(),
                });
                events.push(StreamEvent::ToolCallEnd { id });
                saw_call = true;
            }
        }
    }

    let stop_reason = match candidate["finishReason"].as_str() {
        _ if saw_call => StopReason::ToolUse,
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            StopReason::Safety
        }
        _ => StopReason::EndTurn,
    };
    events.push(StreamEvent::MessageEnd { stop_reason });

    Ok(events)
}
