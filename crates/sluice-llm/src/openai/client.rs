// Streaming client for OpenAI-compatible chat completions endpoints

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Map, Value};

use crate::buffer_utils::decode_chunks;
use crate::config::{ModelInfo, ProviderConfig};
use crate::convert::{convert_messages, convert_tools};
use crate::error::{LlmError, Result};
use crate::params::RequestParameters;
use crate::streaming::{translate_chunks, EventStream};
use crate::traits::ChatClient;
use crate::types::{Message, Tool};

const CLIENT_KEY_HEADER: &str = "x-client-key";

/// Chat completions client (HTTP direct, no SDK)
///
/// Streams are opened once per call; wrap [`ChatClient::create_message`] in a
/// [`RetryPolicy`](crate::retry::RetryPolicy) to re-issue failed requests.
pub struct OpenAICompatibleClient {
    http_client: reqwest::Client,
    config: ProviderConfig,
}

impl OpenAICompatibleClient {
    /// Validate credentials and build the HTTP client.
    ///
    /// No network activity happens here.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = required(config.api_key.as_deref(), "api_key")?;
        let client_key = required(config.client_key.as_deref(), "client_key")?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| LlmError::InvalidConfig("api_key is not a valid header value".to_string()))?,
        );
        headers.insert(
            HeaderName::from_static(CLIENT_KEY_HEADER),
            HeaderValue::from_str(client_key)
                .map_err(|_| LlmError::InvalidConfig("client_key is not a valid header value".to_string()))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        let http_client = builder.build().map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url())
    }

    /// Build the streaming request payload
    fn build_request_body(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<Value> {
        let params = RequestParameters::from_config(&self.config);

        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.config.model_id));
        body.insert(
            "messages".to_string(),
            Value::Array(convert_messages(system_prompt, messages)?),
        );
        body.insert("stream".to_string(), json!(true));
        body.insert("stream_options".to_string(), json!({ "include_usage": true }));

        if let Some(temperature) = params.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = params.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }
        if let Some(effort) = params.reasoning_effort {
            body.insert("reasoning_effort".to_string(), json!(effort.as_str()));
        }
        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body.insert("tools".to_string(), Value::Array(convert_tools(tools)));
            body.insert("tool_choice".to_string(), json!("auto"));
        }

        Ok(Value::Object(body))
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(LlmError::MissingCredential { field })
}

/// Body of a rejected request, or a placeholder naming why it could not be read
fn error_body<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
    body.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Failed to read error response body");
        format!("<unreadable body: {}>", e)
    })
}

#[async_trait]
impl ChatClient for OpenAICompatibleClient {
    async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<EventStream> {
        let body = self.build_request_body(system_prompt, messages, tools)?;

        tracing::info!(
            model = %self.config.model_id,
            base_url = %self.config.base_url(),
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Opening chat completion stream"
        );

        let response = self
            .http_client
            .post(self.completions_url())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = error_body(response.text().await);
            tracing::error!(status = status.as_u16(), "Provider rejected chat completion request");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(translate_chunks(decode_chunks(response.bytes_stream())))
    }

    fn model(&self) -> (&str, &ModelInfo) {
        (&self.config.model_id, &self.config.model_info)
    }
}
