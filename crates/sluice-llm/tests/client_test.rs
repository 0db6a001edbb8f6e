use futures::StreamExt;
use mockito::{Matcher, Server};
use serde_json::json;
use sluice_llm::{
    ChatClient, LlmError, Message, ModelInfo, OpenAICompatibleClient, ProviderConfig,
    ReasoningEffort, RetryPolicy, StreamEvent, Tool,
};
use std::time::Duration;

fn sse(lines: &[serde_json::Value]) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(&format!("data: {}\n\n", line));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn config(base_url: &str) -> ProviderConfig {
    ProviderConfig::new("test-model")
        .with_api_key("sk-test")
        .with_client_key("ck-test")
        .with_base_url(base_url)
}

#[tokio::test]
async fn test_streams_text_tool_call_and_usage() {
    let mut server = Server::new_async().await;
    let body = sse(&[
        json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hello"}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "id": "a1", "type": "function", "function": {"name": "lookup", "arguments": "{\"q\":"}}
        ]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "\"x\"}"}}
        ]}, "finish_reason": "tool_calls"}]}),
        json!({"choices": [], "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}}),
    ]);

    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_header("x-client-key", "ck-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "test-model",
            "stream": true,
            "tool_choice": "auto",
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = OpenAICompatibleClient::new(config(&server.url())).unwrap();
    let tools = vec![Tool::new("lookup", "Look up a value", json!({"type": "object"}))];

    let stream = client
        .create_message("You are terse.", &[Message::user("hi")], Some(&tools))
        .await
        .unwrap();
    let events: Vec<StreamEvent> = stream.map(|e| e.unwrap()).collect().await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Text { text: "Hello".to_string() },
            StreamEvent::ToolCall {
                index: 0,
                id: "a1".to_string(),
                name: "lookup".to_string(),
                arguments: json!({"q": "x"}),
            },
            StreamEvent::Usage {
                input_tokens: 10,
                output_tokens: 5,
                cache_read_tokens: 0,
                cache_write_tokens: 0,
            },
        ]
    );

    mock.assert_async().await;
}

#[tokio::test]
async fn test_request_parameter_policy_on_the_wire() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "max_tokens": 2048,
            "reasoning_effort": "high",
            "stream_options": {"include_usage": true},
        })))
        .with_status(200)
        .with_body(sse(&[]))
        .create_async()
        .await;

    let info = ModelInfo::new()
        .temperature(0.0)
        .max_tokens(2048)
        .supports_reasoning_effort(true);
    let client = OpenAICompatibleClient::new(
        config(&server.url())
            .with_model_info(info)
            .with_reasoning_effort(ReasoningEffort::High),
    )
    .unwrap();

    let events: Vec<_> = client
        .create_message("sys", &[Message::user("hi")], None)
        .await
        .unwrap()
        .collect()
        .await;

    assert!(events.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let result = OpenAICompatibleClient::new(
        ProviderConfig::new("test-model")
            .with_api_key("sk-test")
            .with_base_url(server.url()),
    );

    match result {
        Err(LlmError::MissingCredential { field }) => assert_eq!(field, "client_key"),
        Err(other) => panic!("Expected MissingCredential, got {:?}", other),
        Ok(_) => panic!("Expected MissingCredential"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_status() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"invalid api key"}}"#)
        .create_async()
        .await;

    let client = OpenAICompatibleClient::new(config(&server.url())).unwrap();
    let result = client.create_message("sys", &[Message::user("hi")], None).await;

    match result {
        Err(LlmError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid api key"));
        }
        Err(other) => panic!("Expected Api error, got {:?}", other),
        Ok(_) => panic!("Expected Api error"),
    }
}

#[tokio::test]
async fn test_retry_policy_reissues_request() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("overloaded")
        .expect(2)
        .create_async()
        .await;

    let client = OpenAICompatibleClient::new(config(&server.url())).unwrap();
    let messages = vec![Message::user("hi")];
    let policy = RetryPolicy::new()
        .max_attempts(2)
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(2));

    let result = policy
        .run(|| client.create_message("sys", &messages, None))
        .await;

    assert!(matches!(result, Err(LlmError::Api { status: 503, .. })));
    failing.assert_async().await;
}

#[tokio::test]
async fn test_in_band_stream_error() {
    let mut server = Server::new_async().await;
    let body = format!(
        "data: {}\n\ndata: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": "par"}}]}),
        json!({"error": {"message": "upstream timeout", "code": 504}}),
    );
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = OpenAICompatibleClient::new(config(&server.url())).unwrap();
    let results: Vec<_> = client
        .create_message("sys", &[Message::user("hi")], None)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    assert!(matches!(&results[0], Ok(StreamEvent::Text { text }) if text == "par"));
    assert!(matches!(&results[1], Err(LlmError::Api { status: 504, .. })));
}
