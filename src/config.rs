use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::Result;
use crate::errors::VulnRagError;

/// Prefix for environment overrides, e.g. `VULNRAG__LLM__LLM_KEY`
const ENV_PREFIX: &str = "VULNRAG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_call_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub url: String,
    pub collection: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_call_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a reference to qualify (inclusive)
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Character budget for the assembled reference context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesConfig {
    /// Directory that reference `description` paths are resolved against
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub llm_endpoint: String,
    pub llm_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,
    /// Language the model should write report strings in (English if unset)
    #[serde(default)]
    pub response_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Upper bound for any single external call
    #[serde(default = "default_phase_timeout_secs")]
    pub phase_timeout_secs: u64,
    /// Upper bound for a whole two-phase analysis
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: bool,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

pub(crate) fn default_dimension() -> usize {
    crate::embeddings::DEFAULT_EMBEDDING_DIM
}

pub(crate) fn default_call_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_top_k() -> usize {
    10
}

pub(crate) fn default_threshold() -> f32 {
    0.7
}

pub(crate) fn default_max_context_chars() -> usize {
    60_000
}

pub(crate) fn default_llm_model() -> String {
    "openai/gpt-oss-120b".to_string()
}

pub(crate) fn default_max_tokens() -> u32 {
    4096
}

pub(crate) fn default_temperature() -> f32 {
    0.2
}

pub(crate) fn default_top_p() -> f32 {
    0.9
}

pub(crate) fn default_reasoning_effort() -> String {
    "low".to_string()
}

pub(crate) fn default_phase_timeout_secs() -> u64 {
    180
}

pub(crate) fn default_request_deadline_secs() -> u64 {
    420
}

pub(crate) fn default_max_concurrent_requests() -> usize {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub references: ReferencesConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub server: ServerConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            phase_timeout_secs: default_phase_timeout_secs(),
            request_deadline_secs: default_request_deadline_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default file, with environment overrides
    ///
    /// Reads `config.toml`, falling back to `config.example.toml`, then applies
    /// `VULNRAG__<SECTION>__<KEY>` environment variables on top.
    pub fn load() -> Result<Self> {
        let path = if Path::new("config.toml").exists() {
            "config.toml"
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            "config.example.toml"
        } else {
            return Err(VulnRagError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )));
        };

        Self::load_layered(path)
    }

    /// Load a specific file and apply environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.retrieval.threshold) {
            return Err(VulnRagError::ConfigError(format!(
                "retrieval.threshold must be within [-1, 1], got {}",
                self.retrieval.threshold
            )));
        }
        if self.index.top_k == 0 {
            return Err(VulnRagError::ConfigError(
                "index.top_k must be positive".to_string(),
            ));
        }
        if self.embeddings.dimension == 0 {
            return Err(VulnRagError::ConfigError(
                "embeddings.dimension must be positive".to_string(),
            ));
        }
        if self.analysis.phase_timeout_secs == 0 || self.analysis.request_deadline_secs == 0 {
            return Err(VulnRagError::ConfigError(
                "analysis timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.llm_endpoint
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.llm_model
    }

    /// Per-call timeout
    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.phase_timeout_secs)
    }

    /// Whole-request deadline
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.analysis.request_deadline_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            embeddings: EmbeddingsConfig {
                endpoint: "https://api.cohere.com/v2/embed".to_string(),
                api_key: None,
                model: "embed-v4.0".to_string(),
                dimension: default_dimension(),
                timeout_secs: default_call_timeout_secs(),
            },
            index: IndexConfig {
                url: "http://localhost:6333".to_string(),
                collection: "references".to_string(),
                api_key: None,
                top_k: default_top_k(),
                timeout_secs: default_call_timeout_secs(),
            },
            retrieval: RetrievalConfig::default(),
            references: ReferencesConfig {
                base_dir: PathBuf::from("references"),
            },
            llm: LlmConfig {
                llm_endpoint: "https://openrouter.ai/api/v1".to_string(),
                llm_key: String::new(),
                llm_model: default_llm_model(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
                top_p: default_top_p(),
                reasoning_effort: default_reasoning_effort(),
                response_language: None,
            },
            analysis: AnalysisConfig::default(),
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                cors: false,
                max_concurrent_requests: default_max_concurrent_requests(),
            },
        }
    }
}
