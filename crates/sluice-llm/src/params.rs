//! Request parameter policy.
//!
//! Each field is resolved by its own function so the fallback order stays
//! visible and testable:
//!
//! * temperature: declared nonzero value, else `None` for a declared `0`
//!   (provider default), else [`DEFAULT_TEMPERATURE`] when nothing is declared.
//! * max tokens: declared value only when strictly positive.
//! * reasoning effort: configured value only when the model supports it.

use crate::config::{ModelInfo, ProviderConfig, ReasoningEffort};

/// Temperature sent when the model declares none
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RequestParameters {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl RequestParameters {
    pub fn from_config(config: &ProviderConfig) -> Self {
        let params = Self {
            temperature: resolve_temperature(&config.model_info),
            max_tokens: resolve_max_tokens(&config.model_info),
            reasoning_effort: resolve_reasoning_effort(&config.model_info, config.reasoning_effort),
        };

        tracing::debug!(
            model = %config.model_id,
            temperature = ?params.temperature,
            max_tokens = ?params.max_tokens,
            reasoning_effort = ?params.reasoning_effort,
            context_window = ?config.model_info.context_window,
            prompt_cache = config.model_info.supports_prompt_cache,
            "Resolved request parameters"
        );

        params
    }
}

pub fn resolve_temperature(info: &ModelInfo) -> Option<f32> {
    match info.temperature {
        Some(t) if t == 0.0 => None,
        Some(t) => Some(t),
        None => Some(DEFAULT_TEMPERATURE),
    }
}

pub fn resolve_max_tokens(info: &ModelInfo) -> Option<u32> {
    info.max_tokens
        .filter(|&tokens| tokens > 0)
        .and_then(|tokens| u32::try_from(tokens).ok())
}

pub fn resolve_reasoning_effort(
    info: &ModelInfo,
    configured: Option<ReasoningEffort>,
) -> Option<ReasoningEffort> {
    if info.supports_reasoning_effort {
        configured
    } else {
        None
    }
}
