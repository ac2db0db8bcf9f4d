//! LLM integration
//!
//! A chat-completion wrapper that returns free text plus the provider's stop
//! reason. Providers disagree on the response shape; [`normalize_completion`]
//! accepts both the `choices` form and the bare `completion` form.

pub mod client;

use async_trait::async_trait;
pub use client::normalize_completion;
pub use client::LlmClient;
use serde::Deserialize;
use serde::Serialize;

use crate::config::LlmConfig;
use crate::errors::Result;
use crate::models::TokenUsage;

/// Persona every analysis request runs under
pub const SYSTEM_PROMPT: &str = "You are a Tier-1 cloud security architect and red team lead who \
designs and validates real-world intrusion scenarios against enterprise environments worldwide.";

/// One chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub reasoning_effort: String,
}

impl CompletionRequest {
    /// Request with the sampling settings from configuration
    pub fn from_config(config: &LlmConfig, prompt: impl Into<String>) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            prompt: prompt.into(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            reasoning_effort: config.reasoning_effort.clone(),
        }
    }
}

/// Model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub finish_reason: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl Completion {
    /// The model stopped because it ran out of output tokens
    pub fn is_truncated(&self) -> bool {
        matches!(self.finish_reason.as_str(), "length" | "max_tokens")
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_request_from_config() {
        let config = AppConfig::default();
        let request = CompletionRequest::from_config(&config.llm, "analyze this");
        assert_eq!(request.system, SYSTEM_PROMPT);
        assert_eq!(request.prompt, "analyze this");
        assert_eq!(request.max_tokens, 4096);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert!((request.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(request.reasoning_effort, "low");
    }

    #[test]
    fn test_truncation_detection() {
        let mut completion = Completion {
            text: "{".to_string(),
            finish_reason: "length".to_string(),
            usage: TokenUsage::default(),
        };
        assert!(completion.is_truncated());

        completion.finish_reason = "max_tokens".to_string();
        assert!(completion.is_truncated());

        completion.finish_reason = "stop".to_string();
        assert!(!completion.is_truncated());
    }
}
