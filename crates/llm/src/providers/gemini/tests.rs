use serde_json::json;

use krknai_tool_runtime::{
    AssistantContent, ConversationMessage, SamplingParams, StopReason, StreamEvent, ToolCall,
    ToolDefinition, ToolResult,
};

use super::translate::{build_request_body, messages_to_gemini, parse_response, tools_to_gemini};
use super::{retry_after, GeminiToolProvider};

fn read_file_def() -> ToolDefinition {
    ToolDefinition {
        name: "read_file".into(),
        description: "Read a log file".into(),
        input_schema: json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"]
        }),
    }
}

fn counter_ids() -> impl FnMut() -> String {
    let mut n = 0;
    move || {
        n += 1;
        format!("id{n}")
    }
}

#[test]
fn test_tool_declarations() {
    let tools = tools_to_gemini(&[read_file_def()]);
    let decl = &tools[0]["functionDeclarations"][0];
    assert_eq!(decl["name"], "read_file");
    assert_eq!(decl["parameters"]["required"][0], "path");
}

#[test]
fn test_request_body_structure() {
    let messages = vec![ConversationMessage::User("Analyze this run".into())];
    let sampling = SamplingParams {
        temperature: 0.1,
        max_tokens: 4096,
        top_p: Some(0.95),
    };

    let body = build_request_body(&messages, Some("You are an SRE."), &[read_file_def()], &sampling);

    assert_eq!(body["system_instruction"]["parts"][0]["text"], "You are an SRE.");
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Analyze this run");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    let top_p = body["generationConfig"]["topP"].as_f64().unwrap();
    assert!((top_p - 0.95).abs() < 1e-6);
    assert!(body["tools"][0]["functionDeclarations"].is_array());
}

#[test]
fn test_request_body_without_system_or_tools() {
    let messages = vec![ConversationMessage::User("Hello".into())];
    let body = build_request_body(&messages, None, &[], &SamplingParams::default());

    assert!(body.get("system_instruction").is_none());
    assert!(body.get("tools").is_none());
    assert!(body["generationConfig"].get("topP").is_none());
}

#[test]
fn test_tool_round_trip_translation() {
    let messages = vec![
        ConversationMessage::User("go".into()),
        ConversationMessage::Assistant(AssistantContent {
            text: None,
            tool_calls: vec![
                ToolCall { id: "a".into(), name: "read_file".into(), input: json!({"path": "x.log"}) },
                ToolCall { id: "b".into(), name: "read_file".into(), input: json!({"path": "y.log"}) },
            ],
        }),
        ConversationMessage::ToolResult(ToolResult {
            tool_call_id: "a".into(),
            tool_name: "read_file".into(),
            content: "x contents".into(),
            is_error: false,
        }),
        ConversationMessage::ToolResult(ToolResult {
            tool_call_id: "b".into(),
            tool_name: "read_file".into(),
            content: "denied".into(),
            is_error: true,
        }),
    ];

    let contents = messages_to_gemini(&messages);
    assert_eq!(contents.len(), 3);

    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["path"], "x.log");

    // both responses folded into one user turn
    let responses = contents[2]["parts"].as_array().unwrap();
    assert_eq!(contents[2]["role"], "user");
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["functionResponse"]["response"]["content"], "x contents");
    assert_eq!(responses[1]["functionResponse"]["response"]["error"], "denied");
}

#[test]
fn test_parse_text_response() {
    let resp = json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "All good." }] },
            "finishReason": "STOP"
        }]
    });

    let events = parse_response(&resp, counter_ids()).unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], StreamEvent::TextDelta { text } if text == "All good."));
    assert!(matches!(
        &events[1],
        StreamEvent::MessageEnd { stop_reason: StopReason::EndTurn }
    ));
}

#[test]
fn test_parse_function_call_marks_tool_use() {
    // Gemini reports STOP even when it wants a function called.
    let resp = json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "functionCall": { "name": "read_file", "args": { "path": "a.log" } } },
                    { "functionCall": { "name": "read_file", "args": { "path": "b.log" } } }
                ]
            },
            "finishReason": "STOP"
        }]
    });

    let events = parse_response(&resp, counter_ids()).unwrap();
    assert_eq!(events.len(), 7);
    match &events[0] {
        StreamEvent::ToolCallStart { id, name } => {
            assert_eq!(id, "id1");
            assert_eq!(name, "read_file");
        }
        other => panic!("expected ToolCallStart, got {other:?}"),
    }
    match &events[4] {
        StreamEvent::ToolCallDelta { id, arguments_delta } => {
            assert_eq!(id, "id2");
            let args: serde_json::Value = serde_json::from_str(arguments_delta).unwrap();
            assert_eq!(args["path"], "b.log");
        }
        other => panic!("expected ToolCallDelta, got {other:?}"),
    }
    assert!(matches!(
        events.last(),
        Some(StreamEvent::MessageEnd { stop_reason: StopReason::ToolUse })
    ));
}

#[test]
fn test_parse_skips_thought_parts() {
    let resp = json!({
        "candidates": [{
            "content": { "parts": [
                { "text": "thinking...", "thought": true },
                { "text": "Answer" }
            ]},
            "finishReason": "MAX_TOKENS"
        }]
    });

    let events = parse_response(&resp, counter_ids()).unwrap();
    assert!(matches!(&events[0], StreamEvent::TextDelta { text } if text == "Answer"));
    assert!(matches!(
        &events[1],
        StreamEvent::MessageEnd { stop_reason: StopReason::MaxTokens }
    ));
}

#[test]
fn test_parse_blocked_prompt() {
    let resp = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
    let err = parse_response(&resp, counter_ids()).unwrap_err();
    assert!(err.to_string().contains("SAFETY"));
}

#[test]
fn test_retry_after_from_error_details() {
    let body = r#"{"error":{"code":429,"details":[{"@type":"type.googleapis.com/google.rpc.RetryInfo","retryDelay":"17s"}]}}"#;
    assert_eq!(retry_after(body), Some(17));
    assert_eq!(retry_after("not json"), None);
}

#[test]
fn test_endpoint_trims_trailing_slash() {
    let provider = GeminiToolProvider::new("k".into(), "gemini-2.5-pro".into(), "http://localhost:8080/".into());
    assert_eq!(
        provider.endpoint(),
        "http://localhost:8080/v1beta/models/gemini-2.5-pro:generateContent"
    );
}
