//! CLI command handlers
//!
//! Handlers are organized by domain:
//! - `analyze`: Two-phase analysis and retrieval-only search
//! - `ingest`: Reference corpus embedding
//! - `serve`: API server
//! - `info`: Configuration display

pub mod analyze;
pub mod info;
pub mod ingest;
pub mod serve;

pub use analyze::*;
pub use info::*;
pub use ingest::*;
pub use serve::*;
