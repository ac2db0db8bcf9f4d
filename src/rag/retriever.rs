//! Retrieval of reference scenarios for an infrastructure description

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingRole;
use crate::errors::Result;
use crate::index::SimilarityIndex;
use crate::models::SimilarityHit;

/// Split ranked hits at `threshold` (inclusive), preserving order
pub fn partition_hits(
    hits: Vec<SimilarityHit>,
    threshold: f32,
) -> (Vec<SimilarityHit>, Vec<SimilarityHit>) {
    hits.into_iter().partition(|hit| hit.score >= threshold)
}

/// Result of one retrieval pass
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub qualified: Vec<SimilarityHit>,
    pub rejected: Vec<SimilarityHit>,
}

/// Embeds a query and partitions the nearest references
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn SimilarityIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed `query_text` and return the top `top_k` references split at `threshold`
    pub async fn retrieve(&self, query_text: &str, top_k: usize, threshold: f32) -> Result<Retrieval> {
        let vector = self.embedder.embed(query_text, EmbeddingRole::Query).await?;
        debug!(dimension = vector.len(), top_k, "Query embedded");

        let hits = self.index.query(&vector, top_k).await?;
        let (qualified, rejected) = partition_hits(hits, threshold);

        for hit in &qualified {
            info!(
                rank = hit.rank,
                score = hit.score,
                title = %hit.payload.title,
                "✅ reference qualified"
            );
        }
        for hit in &rejected {
            debug!(
                rank = hit.rank,
                score = hit.score,
                title = %hit.payload.title,
                "❌ reference below threshold"
            );
        }

        Ok(Retrieval {
            qualified,
            rejected,
        })
    }
}
