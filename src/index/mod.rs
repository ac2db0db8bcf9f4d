//! Vector similarity index
//!
//! Reference documents are stored as points (id, vector, payload) and queried
//! by cosine similarity. [`QdrantIndex`] talks to a Qdrant server over REST;
//! [`MemoryIndex`] keeps everything in process.

pub mod memory;
pub mod qdrant;

use std::fmt;

use async_trait::async_trait;
pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::errors::Result;
use crate::models::EmbeddingVector;
use crate::models::SimilarityHit;

/// Point identifier; Qdrant accepts unsigned integers or UUIDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(uuid::Uuid),
}

impl PointId {
    /// Interpret an arbitrary JSON id: integers and UUID strings map directly,
    /// any other string gets a stable name-based UUID.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self::Num),
            Value::String(s) => Some(
                uuid::Uuid::parse_str(s)
                    .map_or_else(|_| Self::Uuid(name_uuid(s)), Self::Uuid),
            ),
            _ => None,
        }
    }
}

/// Deterministic UUID derived from an arbitrary string id
fn name_uuid(name: &str) -> uuid::Uuid {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes())
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

/// A reference document as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub id: PointId,
    pub vector: EmbeddingVector,
    pub payload: Map<String, Value>,
}

/// Similarity index over reference documents
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Top-k most similar points, most similar first
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityHit>>;

    /// Insert or overwrite points by id
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Create the backing collection if it does not exist
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let _ = dimension;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_point_id_from_json() {
        assert_eq!(PointId::from_json(&json!(7)), Some(PointId::Num(7)));
        assert_eq!(PointId::from_json(&json!(-1)), None);
        assert_eq!(PointId::from_json(&json!(null)), None);

        let uuid = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(
            PointId::from_json(&json!(uuid)),
            Some(PointId::Uuid(uuid::Uuid::parse_str(uuid).unwrap()))
        );
    }

    #[test]
    fn test_named_ids_are_stable() {
        let a = PointId::from_json(&json!("iam-privesc-01")).unwrap();
        let b = PointId::from_json(&json!("iam-privesc-01")).unwrap();
        let c = PointId::from_json(&json!("iam-privesc-02")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_point_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(PointId::Num(3)).unwrap(), json!(3));
        let id: PointId = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(id, PointId::Num(12));
    }
}
