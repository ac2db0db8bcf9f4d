//! Embeddings generation module
//!
//! Converts infrastructure descriptions and reference documents into vectors.
//! Corpus documents and search queries are embedded in different modes
//! ([`EmbeddingRole`]); mixing them up makes similarity scores unreliable.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vulnrag::config::AppConfig;
//! use vulnrag::embeddings::{Embedder, EmbeddingClient, EmbeddingRole};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_app_config(&config)?;
//!
//!     let vector = client.embed("{\"nodes\":[]}", EmbeddingRole::Query).await?;
//!     println!("Generated embedding with {} dimensions", vector.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;

use async_trait::async_trait;
pub use client::EmbeddingClient;

use crate::errors::Result;
use crate::models::EmbeddingVector;

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Which side of the search a text is embedded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingRole {
    /// Reference corpus entries
    Document,
    /// Infrastructure descriptions being searched for
    Query,
}

impl EmbeddingRole {
    /// Wire value of the `input_type` request field
    pub const fn input_type(self) -> &'static str {
        match self {
            Self::Document => "search_document",
            Self::Query => "search_query",
        }
    }
}

/// Text embedding backend
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str, role: EmbeddingRole) -> Result<EmbeddingVector>;
}
