//! RAG (Retrieval-Augmented Generation) module
//!
//! End-to-end vulnerability analysis of an infrastructure description:
//! - Semantic retrieval of known-vulnerability reference scenarios
//! - Reference context assembly within a character budget
//! - Two LLM phases (validate-and-expand, then expand-only)
//! - JSON extraction from free-form model output
//!
//! # Examples
//!
//! ```rust,no_run
//! use vulnrag::config::AppConfig;
//! use vulnrag::rag::{AnalysisPipeline, AnalysisRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let pipeline = AnalysisPipeline::from_config(&config)?;
//!
//!     let infra = serde_json::json!({ "nodes": [], "edges": [] });
//!     let outcome = pipeline.analyze(AnalysisRequest::new(infra)).await?;
//!     println!("{}: {} findings", outcome.status(), outcome.report().vulnerabilities.len());
//!
//!     Ok(())
//! }
//! ```

pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod references;
pub mod retriever;

pub use extract::extract;
pub use extract::extract_json;
pub use pipeline::AnalysisPipeline;
pub use pipeline::AnalysisRequest;
pub use pipeline::SearchOutcome;
pub use prompts::build_prompt;
pub use prompts::PromptMode;
pub use prompts::PromptOptions;
pub use references::ReferenceLibrary;
pub use retriever::partition_hits;
pub use retriever::Retriever;
