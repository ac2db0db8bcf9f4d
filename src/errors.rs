use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VulnRagError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Model invocation error: {0}")]
    ModelInvocationError(String),

    #[error("Reference document not found: {0}")]
    MissingReferenceDocument(String),

    #[error("Timed out after {elapsed:?} during {stage}")]
    Timeout { stage: String, elapsed: Duration },

    #[error("Invalid infrastructure description: {0}")]
    InvalidInfrastructure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Config loading error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl VulnRagError {
    /// Short, stable identifier for the error category
    ///
    /// Used as the `kind` of phase diagnostics and in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmbeddingError(_) => "embedding_error",
            Self::IndexUnavailable(_) => "index_unavailable",
            Self::ModelInvocationError(_) => "model_invocation_error",
            Self::MissingReferenceDocument(_) => "missing_reference_document",
            Self::Timeout { .. } => "timeout",
            Self::InvalidInfrastructure(_) => "invalid_infrastructure",
            Self::InvalidInput(_) => "invalid_input",
            Self::ConfigError(_) | Self::Config(_) | Self::TomlParsing(_) => "config_error",
            Self::HttpError(_) => "http_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
            Self::Custom(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, VulnRagError>;
