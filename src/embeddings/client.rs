//! HTTP client for the text-embedding service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::Embedder;
use super::EmbeddingRole;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::models::EmbeddingVector;

/// Client for an embedding endpoint speaking the `texts`/`input_type` protocol
pub struct EmbeddingClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    client: Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: [&'a str; 1],
    input_type: &'static str,
    truncate: &'static str,
    embedding_types: [&'static str; 1],
}

/// `embeddings` has been returned both as a bare list and keyed by type
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingsField {
    List(Vec<Vec<f32>>),
    ByType { float: Vec<Vec<f32>> },
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(
        endpoint: String,
        model: String,
        api_key: Option<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VulnRagError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint,
            model,
            api_key,
            dimension,
            client,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.embeddings.endpoint.clone(),
            config.embeddings.model.clone(),
            config.embeddings.api_key.clone(),
            config.embedding_dimension(),
            Duration::from_secs(config.embeddings.timeout_secs),
        )
    }

    async fn request(&self, text: &str, role: EmbeddingRole) -> Result<Value> {
        let request = EmbedRequest {
            model: &self.model,
            texts: [text],
            input_type: role.input_type(),
            truncate: "NONE",
            embedding_types: ["float"],
        };

        debug!(
            endpoint = %self.endpoint,
            input_type = role.input_type(),
            chars = text.len(),
            "Calling embeddings API"
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VulnRagError::EmbeddingError(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VulnRagError::EmbeddingError(format!(
                "embedding API error ({status}): {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| VulnRagError::EmbeddingError(format!("Failed to parse response: {e}")))
    }
}

/// Pull the first vector out of an embedding response body
///
/// # Errors
/// Fails on a missing `embeddings` field, an unrecognized shape, or an empty list.
pub fn normalize_embedding_response(body: &Value) -> Result<EmbeddingVector> {
    let field = body
        .get("embeddings")
        .ok_or_else(|| VulnRagError::EmbeddingError("response has no embeddings field".into()))?;

    let vectors = match EmbeddingsField::deserialize(field) {
        Ok(EmbeddingsField::List(vectors) | EmbeddingsField::ByType { float: vectors }) => vectors,
        Err(_) => {
            return Err(VulnRagError::EmbeddingError(format!(
                "unrecognized embeddings shape: {}",
                truncate_json(field)
            )))
        }
    };

    vectors
        .into_iter()
        .next()
        .ok_or_else(|| VulnRagError::EmbeddingError("No embedding in response".to_string()))
}

fn truncate_json(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 120 {
        let head: String = text.chars().take(120).collect();
        format!("{head}...")
    } else {
        text
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str, role: EmbeddingRole) -> Result<EmbeddingVector> {
        if text.trim().is_empty() {
            return Err(VulnRagError::EmbeddingError(
                "cannot embed empty text".to_string(),
            ));
        }

        let body = self.request(text, role).await?;
        let vector = normalize_embedding_response(&body)?;

        if vector.len() != self.dimension {
            return Err(VulnRagError::EmbeddingError(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                vector.len()
            )));
        }

        Ok(vector)
    }
}
