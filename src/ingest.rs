//! Reference corpus ingestion
//!
//! Embeds each reference item's `resources` in document mode and stores the
//! whole item as the point payload, so `title` and `description` come back
//! with every search hit.

use std::path::Path;
use std::sync::Arc;

use futures::stream;
use futures::stream::StreamExt;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingRole;
use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::index::IndexPoint;
use crate::index::PointId;
use crate::index::SimilarityIndex;

const UPSERT_BATCH_SIZE: usize = 64;

/// One entry of a reference corpus file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReferenceItem {
    /// Text embedded for this item
    pub fn embedding_text(&self) -> Result<String> {
        let resources = if self.resources.is_null() {
            Value::Array(Vec::new())
        } else {
            self.resources.clone()
        };
        Ok(serde_json::to_string_pretty(&resources)?)
    }

    fn point_id(&self) -> Result<PointId> {
        PointId::from_json(&self.id).ok_or_else(|| {
            VulnRagError::InvalidInput(format!("unsupported reference id {}", self.id))
        })
    }

    fn payload(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(VulnRagError::InvalidInput(
                "reference item must be an object".to_string(),
            )),
        }
    }
}

/// Parse a corpus file: a JSON array of reference items
pub fn load_reference_items(path: &Path) -> Result<Vec<ReferenceItem>> {
    let content = std::fs::read_to_string(path)?;
    let items: Vec<ReferenceItem> = serde_json::from_str(&content)?;
    Ok(items)
}

/// Statistics from an ingestion run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub total: usize,
    pub stored: usize,
    pub failed: usize,
}

/// Embed and upsert reference items
pub async fn ingest_references(
    items: Vec<ReferenceItem>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    dimension: usize,
    concurrency: usize,
) -> Result<IngestStats> {
    let mut stats = IngestStats {
        total: items.len(),
        ..IngestStats::default()
    };
    if items.is_empty() {
        return Ok(stats);
    }

    index.ensure_collection(dimension).await?;
    info!("Embedding {} reference items", items.len());

    let results: Vec<Result<IndexPoint>> = stream::iter(items.iter())
        .map(|item| {
            let embedder = Arc::clone(&embedder);
            async move {
                let id = item.point_id()?;
                let text = item.embedding_text()?;
                let vector = embedder.embed(&text, EmbeddingRole::Document).await?;
                Ok::<_, VulnRagError>(IndexPoint {
                    id,
                    vector,
                    payload: item.payload()?,
                })
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut points = Vec::with_capacity(results.len());
    for (item, result) in items.iter().zip(results) {
        match result {
            Ok(point) => {
                info!(
                    id = %item.id,
                    title = item.title.as_deref().unwrap_or("unknown"),
                    "Embedded reference"
                );
                points.push(point);
            }
            Err(e) => {
                warn!("Failed to embed reference {}: {}", item.id, e);
                stats.failed += 1;
            }
        }
    }

    for chunk in points.chunks(UPSERT_BATCH_SIZE) {
        index.upsert(chunk.to_vec()).await?;
        stats.stored += chunk.len();
    }

    info!(
        "Ingestion complete: {} stored, {} failed",
        stats.stored, stats.failed
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::index::MemoryIndex;
    use crate::models::EmbeddingVector;

    /// Embeds text as (length, 1.0) and refuses texts containing "boom"
    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str, role: EmbeddingRole) -> Result<EmbeddingVector> {
            assert_eq!(role, EmbeddingRole::Document);
            if text.contains("boom") {
                return Err(VulnRagError::EmbeddingError("boom".to_string()));
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn items() -> Vec<ReferenceItem> {
        serde_json::from_value(json!([
            {
                "id": 1,
                "title": "vulnerable_lambda",
                "description": "lambda/vulnerable.md",
                "resources": [{ "content": { "type": "lambda" } }]
            },
            {
                "id": "eventbridge-target",
                "title": "eventbridge_target",
                "description": "eventbridge.md",
                "resources": [{ "content": "boom" }]
            },
            {
                "id": 3,
                "title": "key_rotation",
                "description": "iam/key_rotation.md",
                "resources": [],
                "cve": "n/a"
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_embedding_text_is_pretty_resources() {
        let item = &items()[0];
        let text = item.embedding_text().unwrap();
        assert!(text.starts_with("[\n"));
        assert!(text.contains("\"type\": \"lambda\""));
    }

    #[test]
    fn test_payload_keeps_whole_item() {
        let payload = items()[2].payload().unwrap();
        assert_eq!(payload["title"], "key_rotation");
        assert_eq!(payload["description"], "iam/key_rotation.md");
        assert_eq!(payload["cve"], "n/a");
    }

    #[tokio::test]
    async fn test_ingest_stores_and_counts_failures() {
        let index = Arc::new(MemoryIndex::new());
        let stats = ingest_references(items(), Arc::new(LengthEmbedder), index.clone(), 2, 4)
            .await
            .unwrap();

        assert_eq!(stats, IngestStats { total: 3, stored: 2, failed: 1 });
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_reingest_overwrites() {
        let index = Arc::new(MemoryIndex::new());
        for _ in 0..2 {
            ingest_references(items(), Arc::new(LengthEmbedder), index.clone(), 2, 1)
                .await
                .unwrap();
        }
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_load_reference_items() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("refs.json");
        std::fs::write(&path, serde_json::to_string(&json!([{ "id": 1 }])).unwrap()).unwrap();

        let items = load_reference_items(&path).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].title.is_none());

        std::fs::write(&path, "{\"id\": 1}").unwrap();
        assert!(load_reference_items(&path).is_err());
    }
}
