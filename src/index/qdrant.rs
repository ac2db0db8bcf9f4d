//! Qdrant REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use super::IndexPoint;
use super::SimilarityIndex;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::models::ReferencePayload;
use crate::models::SimilarityHit;

/// Similarity index backed by a Qdrant collection
pub struct QdrantIndex {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

impl QdrantIndex {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VulnRagError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_key,
            client,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.index.url.clone(),
            config.index.collection.clone(),
            config.index.api_key.clone(),
            Duration::from_secs(config.index.timeout_secs),
        )
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| VulnRagError::IndexUnavailable(format!("{what}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VulnRagError::IndexUnavailable(format!(
                "{what} failed ({status}): {body}"
            )));
        }
        Ok(response)
    }
}

/// Turn a Qdrant search body into ranked hits
pub(crate) fn hits_from_search(body: Value) -> Result<Vec<SimilarityHit>> {
    let response: SearchResponse = serde_json::from_value(body)
        .map_err(|e| VulnRagError::IndexUnavailable(format!("unexpected search response: {e}")))?;

    response
        .result
        .into_iter()
        .enumerate()
        .map(|(idx, point)| {
            let payload: ReferencePayload =
                serde_json::from_value(Value::Object(point.payload.unwrap_or_default()))?;
            Ok::<_, VulnRagError>(SimilarityHit {
                payload,
                score: point.score,
                rank: idx + 1,
            })
        })
        .collect()
}

#[async_trait]
impl SimilarityIndex for QdrantIndex {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityHit>> {
        if k == 0 {
            return Err(VulnRagError::InvalidInput("k must be positive".to_string()));
        }

        debug!(collection = %self.collection, k, "Querying vector index");

        let body = json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
        });
        let response = self
            .send(
                self.client
                    .post(format!("{}/points/search", self.collection_url()))
                    .json(&body),
                "search",
            )
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| VulnRagError::IndexUnavailable(format!("invalid search body: {e}")))?;
        hits_from_search(body)
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let body = json!({ "points": points });
        self.send(
            self.client
                .put(format!("{}/points?wait=true", self.collection_url()))
                .json(&body),
            "upsert",
        )
        .await?;

        debug!(collection = %self.collection, count, "Upserted points");
        Ok(())
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let existing = self
            .authorize(self.client.get(self.collection_url()))
            .send()
            .await
            .map_err(|e| VulnRagError::IndexUnavailable(format!("collection lookup: {e}")))?;
        if existing.status().is_success() {
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        self.send(
            self.client.put(self.collection_url()).json(&body),
            "create collection",
        )
        .await?;

        info!(collection = %self.collection, dimension, "Created vector collection");
        Ok(())
    }
}
