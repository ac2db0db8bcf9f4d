//! In-process cosine index

use async_trait::async_trait;
use dashmap::DashMap;

use super::IndexPoint;
use super::PointId;
use super::SimilarityIndex;
use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::models::ReferencePayload;
use crate::models::SimilarityHit;

/// Thread-safe in-memory index
///
/// Scores are cosine similarity. Equal scores are ordered by ascending point
/// id so results are deterministic.
#[derive(Default)]
pub struct MemoryIndex {
    points: DashMap<PointId, IndexPoint>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Cosine similarity; `None` for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some((dot / denom).clamp(-1.0, 1.0) as f32)
}

#[async_trait]
impl SimilarityIndex for MemoryIndex {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityHit>> {
        if k == 0 {
            return Err(VulnRagError::InvalidInput("k must be positive".to_string()));
        }

        let mut scored: Vec<(f32, PointId, ReferencePayload)> = Vec::new();
        for entry in &self.points {
            let point = entry.value();
            let Some(score) = cosine_similarity(vector, &point.vector) else {
                continue;
            };
            let payload: ReferencePayload =
                serde_json::from_value(serde_json::Value::Object(point.payload.clone()))?;
            scored.push((score, point.id.clone(), payload));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(idx, (score, _, payload))| SimilarityHit {
                payload,
                score,
                rank: idx + 1,
            })
            .collect())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        for point in points {
            self.points.insert(point.id.clone(), point);
        }
        Ok(())
    }
}
