use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LlmError, Result};
use crate::tool_calls::ToolCallProcessor;

/// Boxed stream of events handed to the calling agent loop
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Text {
        text: String,
    },

    Reasoning {
        text: String,
    },

    /// A tool call whose arguments parsed as complete JSON
    ToolCall {
        index: u32,
        id: String,
        name: String,
        arguments: Value,
    },

    /// A tool call that was still unusable when the stream ended
    MalformedToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        raw_arguments: String,
        reason: String,
    },

    Usage {
        input_tokens: u32,
        output_tokens: u32,
        cache_read_tokens: u32,
        cache_write_tokens: u32,
    },
}

// ============================================================================
// WIRE TYPES (chat completions stream)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub usage: Option<ChunkUsage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Nonstandard field some providers use for thinking text
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub tool_type: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    /// DeepSeek-style cache hit count
    #[serde(default)]
    pub prompt_cache_hit_tokens: Option<u32>,
    /// Cache write count, only reported by some providers
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u32>,
}

/// Some providers send `null` where a field is absent
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChunkUsage {
    pub fn cache_read_tokens(&self) -> u32 {
        self.prompt_tokens_details
            .as_ref()
            .and_then(|d| d.cached_tokens)
            .or(self.prompt_cache_hit_tokens)
            .unwrap_or(0)
    }

    pub fn cache_write_tokens(&self) -> u32 {
        self.cache_creation_input_tokens.unwrap_or(0)
    }

    fn to_event(&self) -> StreamEvent {
        StreamEvent::Usage {
            input_tokens: self.prompt_tokens,
            output_tokens: self.completion_tokens,
            cache_read_tokens: self.cache_read_tokens(),
            cache_write_tokens: self.cache_write_tokens(),
        }
    }
}

impl ChatStreamChunk {
    /// Map one chunk to events; every check may fire for the same chunk.
    ///
    /// A `finish_reason` settles pending tool calls, so they are emitted
    /// before the usage block that trails the final choice.
    pub fn to_stream_events(&self, tool_calls: &mut ToolCallProcessor) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(choice) = self.choices.first() {
            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::Text {
                        text: content.clone(),
                    });
                }
            }

            if let Some(reasoning) = &choice.delta.reasoning_content {
                if !reasoning.is_empty() {
                    events.push(StreamEvent::Reasoning {
                        text: reasoning.clone(),
                    });
                }
            }

            if !choice.delta.tool_calls.is_empty() {
                events.extend(tool_calls.process_deltas(&choice.delta.tool_calls));
            }

            if choice.finish_reason.is_some() {
                events.extend(tool_calls.finish());
            }
        }

        if let Some(usage) = &self.usage {
            events.push(usage.to_event());
        }

        events
    }
}

/// Translate decoded chunks into events.
///
/// Owns a fresh [`ToolCallProcessor`]; pending tool calls are settled at the
/// first `finish_reason`, or once the chunk stream is exhausted if none came.
/// An error item is forwarded and ends the stream.
pub fn translate_chunks<S>(chunks: S) -> EventStream
where
    S: Stream<Item = Result<ChatStreamChunk>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut tool_calls = ToolCallProcessor::new();

        while let Some(chunk_result) = chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    for event in chunk.to_stream_events(&mut tool_calls) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        for event in tool_calls.finish() {
            yield Ok(event);
        }
    })
}

/// Surface an in-band `{"error": {...}}` payload, if the data line carries one
pub(crate) fn in_band_error(data: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorBody,
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        code: Option<Value>,
    }

    let envelope: ErrorEnvelope = serde_json::from_str(data).ok()?;
    let status = envelope
        .error
        .code
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(500);

    Some(LlmError::Api {
        status,
        message: envelope
            .error
            .message
            .unwrap_or_else(|| "unknown error in stream".to_string()),
    })
}
