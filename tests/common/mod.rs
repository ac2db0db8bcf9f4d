//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use vulnrag::embeddings::Embedder;
use vulnrag::embeddings::EmbeddingRole;
use vulnrag::index::IndexPoint;
use vulnrag::index::MemoryIndex;
use vulnrag::index::PointId;
use vulnrag::index::SimilarityIndex;
use vulnrag::llm::Completion;
use vulnrag::llm::CompletionRequest;
use vulnrag::llm::LanguageModel;
use vulnrag::models::EmbeddingVector;
use vulnrag::models::TokenUsage;
use vulnrag::rag::AnalysisPipeline;
use vulnrag::AppConfig;
use vulnrag::Result;
use vulnrag::VulnRagError;

/// Always returns the same query vector
pub struct FixedEmbedder(pub EmbeddingVector);

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str, _role: EmbeddingRole) -> Result<EmbeddingVector> {
        Ok(self.0.clone())
    }
}

/// Embedder whose backend is down
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str, _role: EmbeddingRole) -> Result<EmbeddingVector> {
        Err(VulnRagError::EmbeddingError("connection refused".to_string()))
    }
}

/// One scripted model reply
pub enum Reply {
    Text(&'static str),
    Truncated(&'static str),
    Error(&'static str),
    Stall(Duration),
}

/// Language model that answers from a script, in call order
///
/// Prompts are recorded so tests can inspect what each phase sent.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn completion(text: &str, finish_reason: &str) -> Completion {
    Completion {
        text: text.to_string(),
        finish_reason: finish_reason.to_string(),
        usage: TokenUsage {
            input_tokens: 100,
            output_tokens: 20,
        },
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.prompts.lock().unwrap().push(request.prompt);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(completion(text, "stop")),
            Some(Reply::Truncated(text)) => Ok(completion(text, "length")),
            Some(Reply::Error(message)) => {
                Err(VulnRagError::ModelInvocationError(message.to_string()))
            }
            Some(Reply::Stall(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(completion("{}", "stop"))
            }
            None => Err(VulnRagError::ModelInvocationError(
                "script exhausted".to_string(),
            )),
        }
    }
}

pub const PRIMARY_REPLY: &str = r#"Validated against the references.
```json
{
  "summary": {"high": 1, "medium": 0, "low": 0},
  "vulnerabilities": [
    {
      "severity": "high",
      "title": "PassRole to admin Lambda",
      "description": "alice can pass the admin role to a new function",
      "attackPath": ["create function", "invoke"],
      "impact": "account takeover",
      "recommendation": "scope iam:PassRole",
      "cvss_score": 8.8,
      "source": "rag_doc_1",
      "confidence": 0.95,
      "confidence_reason": "all permissions present"
    }
  ],
  "rejected_scenarios": [
    {
      "source": "rag_doc_2",
      "doc_title": "ec2_ssrf",
      "rejection_reason": "no EC2 instances",
      "missing_permissions": ["ec2:RunInstances"]
    }
  ]
}
```"#;

pub const SECONDARY_REPLY: &str = r#"{
  "summary": {"high": 0, "medium": 1, "low": 1},
  "vulnerabilities": [
    {
      "severity": "medium",
      "title": "PassRole to admin Lambda",
      "description": "duplicate of a primary finding",
      "attackPath": [],
      "impact": "",
      "recommendation": "",
      "cvss_score": 6.0
    },
    {
      "severity": "low",
      "title": "Console user without MFA",
      "description": "alice has no MFA device",
      "attackPath": ["phish password"],
      "impact": "credential theft",
      "recommendation": "enforce MFA",
      "cvss_score": 3.1
    }
  ]
}"#;

/// Graph with one user and one role
pub fn sample_infrastructure() -> serde_json::Value {
    json!({
        "nodes": [
            {"node_id": "user:alice", "type": "iam_user", "name": "alice"},
            {"node_id": "role:admin", "type": "iam_role", "name": "admin"}
        ],
        "edges": [
            {"id": "e1", "src": "user:alice", "dst": "role:admin", "relation": "CAN_PASS_ROLE", "directed": true}
        ]
    })
}

fn point(id: u64, vector: Vec<f32>, title: &str, path: &str) -> IndexPoint {
    let payload = json!({"title": title, "description": path});
    IndexPoint {
        id: PointId::Num(id),
        vector,
        payload: payload.as_object().cloned().unwrap_or_default(),
    }
}

/// Index holding two references; against the query `[1, 0]` they score
/// 1.0 and 0.6
pub async fn seeded_index() -> Arc<MemoryIndex> {
    let index = Arc::new(MemoryIndex::new());
    index
        .upsert(vec![
            point(1, vec![1.0, 0.0], "passrole_lambda", "passrole.md"),
            point(2, vec![0.6, 0.8], "ec2_ssrf", "ssrf.md"),
        ])
        .await
        .unwrap();
    index
}

/// Write the reference documents `seeded_index` points at
pub fn write_reference_docs(dir: &Path) {
    std::fs::write(dir.join("passrole.md"), "PassRole scenario body").unwrap();
    std::fs::write(dir.join("ssrf.md"), "SSRF scenario body").unwrap();
}

/// Configuration rooted at `reference_dir` with short time limits
pub fn test_config(reference_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.references.base_dir = reference_dir.to_path_buf();
    config.retrieval.threshold = 0.7;
    config.index.top_k = 5;
    config.analysis.phase_timeout_secs = 5;
    config.analysis.request_deadline_secs = 10;
    config
}

pub fn pipeline(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    model: Arc<ScriptedModel>,
) -> AnalysisPipeline {
    AnalysisPipeline::new(config, embedder, index, model)
}
