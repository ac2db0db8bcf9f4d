//! HTTP client for an OpenAI-compatible chat-completions endpoint

use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use super::Completion;
use super::CompletionRequest;
use super::LanguageModel;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::models::TokenUsage;

pub struct LlmClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl LlmClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VulnRagError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.llm_endpoint(),
            config.llm.llm_key.clone(),
            config.llm_model(),
            config.phase_timeout(),
        )
    }

    fn payload(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "top_p": request.top_p,
            "reasoning_effort": request.reasoning_effort,
        })
    }
}

fn token_count(usage: &Value, primary: &str, fallback: &str) -> u64 {
    usage
        .get(primary)
        .or_else(|| usage.get(fallback))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Normalize either provider response shape into a [`Completion`]
///
/// Accepts `choices[0].message.content` with `finish_reason`, or a top-level
/// `completion` with `stop_reason`.
pub fn normalize_completion(body: &Value) -> Result<Completion> {
    let (text, finish_reason) = if let Some(choice) = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    {
        let text = choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                VulnRagError::ModelInvocationError("choice has no message content".to_string())
            })?;
        let reason = choice.get("finish_reason").and_then(Value::as_str);
        (text.to_string(), reason)
    } else if let Some(text) = body.get("completion").and_then(Value::as_str) {
        let reason = body.get("stop_reason").and_then(Value::as_str);
        (text.to_string(), reason)
    } else {
        return Err(VulnRagError::ModelInvocationError(
            "response has neither choices nor completion".to_string(),
        ));
    };

    let usage = body.get("usage").map_or_else(TokenUsage::default, |usage| TokenUsage {
        input_tokens: token_count(usage, "prompt_tokens", "input_tokens"),
        output_tokens: token_count(usage, "completion_tokens", "output_tokens"),
    });

    Ok(Completion {
        text,
        finish_reason: finish_reason.unwrap_or("unknown").to_string(),
        usage,
    })
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            max_tokens = request.max_tokens,
            "Calling chat completions"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&request))
            .send()
            .await
            .map_err(|e| VulnRagError::ModelInvocationError(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VulnRagError::ModelInvocationError(format!(
                "LLM API error ({status}): {error_text}"
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            VulnRagError::ModelInvocationError(format!("Failed to parse response: {e}"))
        })?;
        let completion = normalize_completion(&body)?;

        info!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            finish_reason = %completion.finish_reason,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "LLM call finished"
        );
        Ok(completion)
    }
}
