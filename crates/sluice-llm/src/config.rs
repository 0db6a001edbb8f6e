// Provider and model configuration consumed by the streaming client

use serde::{Deserialize, Serialize};

/// Endpoint used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Reasoning effort level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Capabilities and defaults declared for a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Declared sampling temperature. `Some(0.0)` means "use the provider default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Output token limit. Non-positive values are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,

    #[serde(default)]
    pub supports_reasoning_effort: bool,

    #[serde(default)]
    pub supports_prompt_cache: bool,
}

impl ModelInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn context_window(mut self, context_window: u32) -> Self {
        self.context_window = Some(context_window);
        self
    }

    pub fn supports_reasoning_effort(mut self, supported: bool) -> Self {
        self.supports_reasoning_effort = supported;
        self
    }

    pub fn supports_prompt_cache(mut self, supported: bool) -> Self {
        self.supports_prompt_cache = supported;
        self
    }
}

/// Complete configuration for one provider/model pairing
///
/// Credentials are optional here so that a missing key is reported by the
/// client with the field name instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,

    /// Base URL (optional, defaults to [`DEFAULT_BASE_URL`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub model_id: String,

    #[serde(default)]
    pub model_info: ModelInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            api_key: None,
            client_key: None,
            base_url: None,
            model_id: model_id.into(),
            model_info: ModelInfo::default(),
            reasoning_effort: None,
            connect_timeout_secs: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_client_key(mut self, client_key: impl Into<String>) -> Self {
        self.client_key = Some(client_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model_info(mut self, model_info: ModelInfo) -> Self {
        self.model_info = model_info;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// Configured base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let config = ProviderConfig::new("gpt-4o");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ProviderConfig::new("gpt-4o").with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_blank_base_url_falls_back() {
        let config = ProviderConfig::new("gpt-4o").with_base_url("  ");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "api_key": "sk-test",
            "model_id": "deepseek-reasoner",
            "model_info": { "temperature": 0, "supports_reasoning_effort": true },
            "reasoning_effort": "high"
        }"#;

        let config: ProviderConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.client_key, None);
        assert_eq!(config.model_info.temperature, Some(0.0));
        assert_eq!(config.model_info.max_tokens, None);
        assert!(config.model_info.supports_reasoning_effort);
        assert_eq!(config.reasoning_effort, Some(ReasoningEffort::High));
    }
}
