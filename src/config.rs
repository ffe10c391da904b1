//! Configuration
//!
//! Loaded from YAML. Every field has a default so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of results returned by a search
pub const DEFAULT_TOP_K: usize = 5;
/// Default minimum similarity a result must exceed
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.2;
/// Default hashing model dimension
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Embedding provider options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature-hashing model, no network
    #[default]
    Hashing,
    Ollama,
    OpenAI,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// The provider to use
    pub provider: EmbeddingProvider,
    /// Model name (e.g., "all-minilm", "text-embedding-3-small")
    pub model: String,
    /// API key (OpenAI falls back to the OPENAI_API_KEY env var)
    pub api_key: Option<String>,
    /// API base URL (optional, provider default otherwise)
    pub api_base_url: Option<String>,
    /// Vector dimension. Remote models are probed when unset.
    pub dimension: Option<usize>,
    /// Request timeout for remote providers
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hashing,
            model: "all-minilm".to_string(),
            api_key: None,
            api_base_url: None,
            dimension: None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn hashing_dimension(&self) -> usize {
        self.dimension.unwrap_or(DEFAULT_HASHING_DIMENSION)
    }
}

/// Search defaults used when the caller does not supply them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    pub score_threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("search.top_k must be greater than zero".to_string()));
        }
        if !self.score_threshold.is_finite() {
            return Err(ConfigError::Invalid("search.score_threshold must be finite".to_string()));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsimConfig {
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    /// Path of the document store snapshot file
    pub store_path: PathBuf,
}

impl Default for DocsimConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            store_path: PathBuf::from("docsim.db"),
        }
    }
}

impl DocsimConfig {
    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: DocsimConfig = serde_yaml::from_str(content)?;
        config.search.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocsimConfig::default();
        assert_eq!(config.search.top_k, 5);
        assert!((config.search.score_threshold - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
        assert_eq!(config.embedding.hashing_dimension(), 384);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
embedding:
  provider: ollama
  model: nomic-embed-text
search:
  top_k: 10
"#;
        let config = DocsimConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.timeout_secs, 30);
        assert_eq!(config.search.top_k, 10);
        assert!((config.search.score_threshold - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.store_path, PathBuf::from("docsim.db"));
    }

    #[test]
    fn test_openai_provider_name() {
        let config = DocsimConfig::from_yaml("embedding:\n  provider: openai\n").unwrap();
        assert_eq!(config.embedding.provider, EmbeddingProvider::OpenAI);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let err = DocsimConfig::from_yaml("search:\n  top_k: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docsim.yaml");
        std::fs::write(&path, "store_path: /tmp/docs.db\nsearch:\n  score_threshold: 0.5\n").unwrap();

        let config = DocsimConfig::load(&path).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/docs.db"));
        assert!((config.search.score_threshold - 0.5).abs() < f32::EPSILON);

        assert!(matches!(
            DocsimConfig::load(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
