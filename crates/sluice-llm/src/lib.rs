pub mod types;
pub mod config;
pub mod error;
pub mod params;
pub mod convert;
pub mod traits;
pub mod streaming;
pub mod tool_calls;
pub mod buffer_utils;
pub mod retry;
pub mod openai;

pub use config::{ModelInfo, ProviderConfig, ReasoningEffort, DEFAULT_BASE_URL};
pub use error::{LlmError, Result};
pub use params::{RequestParameters, DEFAULT_TEMPERATURE};
pub use traits::ChatClient;
pub use streaming::{translate_chunks, ChatStreamChunk, EventStream, StreamEvent, ToolCallDelta};
pub use tool_calls::ToolCallProcessor;
pub use retry::{with_retry, RetryPolicy};
pub use openai::OpenAICompatibleClient;
pub use types::{Content, Message, Tool, ToolCall};
