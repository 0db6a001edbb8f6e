use async_trait::async_trait;

use crate::config::ModelInfo;
use crate::error::Result;
use crate::streaming::EventStream;
use crate::types::{Message, Tool};

/// A provider that streams one assistant turn as [`StreamEvent`]s
///
/// [`StreamEvent`]: crate::streaming::StreamEvent
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Open a streaming completion for the given conversation.
    ///
    /// Configuration and connection errors are returned here, before any
    /// event is produced; failures after that arrive as stream items.
    async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<EventStream>;

    /// Model id and capabilities used for requests
    fn model(&self) -> (&str, &ModelInfo);
}
