// Conversion from stored conversation messages to chat-completions wire format

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::types::{Content, ContentPart, Message, Tool, ToolCall};

/// Build the wire `messages` array: system prompt first, then the history.
pub fn convert_messages(system_prompt: &str, messages: &[Message]) -> Result<Vec<Value>> {
    let mut converted = Vec::with_capacity(messages.len() + 1);

    converted.push(json!({
        "role": "system",
        "content": system_prompt,
    }));

    for message in messages {
        converted.push(convert_message(message)?);
    }

    Ok(converted)
}

fn convert_message(message: &Message) -> Result<Value> {
    match message {
        Message::User { content } => Ok(json!({
            "role": "user",
            "content": convert_content(content),
        })),
        Message::Assistant { content, tool_calls } => {
            let mut obj = Map::new();
            obj.insert("role".to_string(), json!("assistant"));

            if let Some(content) = content {
                obj.insert("content".to_string(), convert_content(content));
            }

            if !tool_calls.is_empty() {
                let calls = tool_calls
                    .iter()
                    .map(convert_tool_call)
                    .collect::<Result<Vec<_>>>()?;
                obj.insert("tool_calls".to_string(), Value::Array(calls));
            }

            Ok(Value::Object(obj))
        }
        Message::Tool { tool_call_id, content } => Ok(json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": convert_content(content),
        })),
    }
}

/// Arguments go back to the provider as a JSON-encoded string
fn convert_tool_call(call: &ToolCall) -> Result<Value> {
    Ok(json!({
        "id": call.id,
        "type": "function",
        "function": {
            "name": call.name,
            "arguments": serde_json::to_string(&call.arguments)?,
        },
    }))
}

fn convert_content(content: &Content) -> Value {
    match content {
        Content::Text(s) => json!(s),
        Content::Parts(parts) => Value::Array(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => json!({
                        "type": "text",
                        "text": text,
                    }),
                })
                .collect(),
        ),
    }
}

/// Wire function declarations for the `tools` request field
pub fn convert_tools(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            let mut function = Map::new();
            function.insert("name".to_string(), json!(tool.name));
            if let Some(description) = &tool.description {
                function.insert("description".to_string(), json!(description));
            }
            function.insert("parameters".to_string(), tool.parameters.clone());

            json!({
                "type": "function",
                "function": Value::Object(function),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_comes_first() {
        let converted = convert_messages("Be brief.", &[Message::user("Hi")]).unwrap();

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0], json!({"role": "system", "content": "Be brief."}));
        assert_eq!(converted[1], json!({"role": "user", "content": "Hi"}));
    }

    #[test]
    fn test_assistant_tool_calls_encode_arguments_as_string() {
        let call = ToolCall::new("call_1", "lookup", json!({"q": "x"}));
        let converted = convert_messages("", &[Message::assistant_with_tools(vec![call])]).unwrap();

        let assistant = &converted[1];
        assert_eq!(assistant["role"], "assistant");
        assert!(assistant.get("content").is_none());
        assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        assert_eq!(assistant["tool_calls"][0]["function"]["name"], "lookup");
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], r#"{"q":"x"}"#);
    }

    #[test]
    fn test_tool_result_message() {
        let converted = convert_messages("", &[Message::tool_result("call_1", "42")]).unwrap();

        assert_eq!(
            converted[1],
            json!({"role": "tool", "tool_call_id": "call_1", "content": "42"})
        );
    }

    #[test]
    fn test_multipart_content() {
        let content = Content::Parts(vec![
            ContentPart::Text { text: "a".to_string() },
            ContentPart::Text { text: "b".to_string() },
        ]);
        let converted = convert_messages("", &[Message::User { content }]).unwrap();

        assert_eq!(
            converted[1]["content"],
            json!([{"type": "text", "text": "a"}, {"type": "text", "text": "b"}])
        );
    }

    #[test]
    fn test_convert_tools() {
        let tools = vec![Tool::new(
            "get_weather",
            "Get weather for a city",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        )];

        let converted = convert_tools(&tools);

        assert_eq!(converted[0]["type"], "function");
        assert_eq!(converted[0]["function"]["name"], "get_weather");
        assert_eq!(converted[0]["function"]["description"], "Get weather for a city");
        assert_eq!(converted[0]["function"]["parameters"]["type"], "object");
    }
}
