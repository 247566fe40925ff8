use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::PolicyError;
use crate::ingestion::chunker::ChunkerConfig;
use crate::rag::reasoner::ReasonerConfig;
use crate::rag::retrieval::SearchParams;

pub const DEFAULT_TOKENIZER_MODEL: &str = "Xenova/gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_COLLECTION: &str = "insurance_policy_chunks";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkerConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: SearchParams,
    #[serde(default)]
    pub reasoner: ReasonerConfig,
    #[serde(default)]
    pub answerer: AnswererConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Sub-word tokenizer loaded from the HuggingFace hub
    Huggingface,
    /// Offline whitespace splitter
    Whitespace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub kind: TokenizerKind,
    pub model_id: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            kind: TokenizerKind::Huggingface,
            model_id: DEFAULT_TOKENIZER_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_id: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Qdrant,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Qdrant endpoint
    pub url: String,
    pub collection: String,
    /// Snapshot file for the local backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Upsert batch size during rebuilds (throughput only)
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            local_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl StoreConfig {
    /// Local snapshot path, defaulting next to the config file
    pub fn local_path(&self) -> Result<PathBuf> {
        match &self.local_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::base_dir()?.join("corpus.json")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswererConfig {
    pub enabled: bool,
    pub ollama_url: String,
    pub model: String,
}

impl Default for AnswererConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ollama_url: crate::answer::DEFAULT_OLLAMA_URL.to_string(),
            model: crate::answer::DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub docs_dir: PathBuf,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding config and local corpus snapshot
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".policylens"))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Check every section; fails before any document is processed
    pub fn validate(&self) -> std::result::Result<(), PolicyError> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        self.reasoner.validate()?;

        if self.store.batch_size == 0 {
            return Err(PolicyError::ConfigurationError(
                "store.batch_size must be at least 1".to_string(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(PolicyError::ConfigurationError(
                "store.collection must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chunking.max_chunk_tokens, 400);
        assert_eq!(config.chunking.overlap_tokens, 50);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.store.batch_size, 1000);
        assert_eq!(config.store.collection, "insurance_policy_chunks");
        assert_eq!(config.reasoner.excerpt_chars, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_not_smaller_than_window_is_rejected() {
        let mut config = Config::default();
        config.chunking.overlap_tokens = config.chunking.max_chunk_tokens;
        assert!(matches!(
            config.validate(),
            Err(PolicyError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let mut config = Config::default();
        config.store.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 8;
        config.store.backend = StoreBackend::Local;
        config.tokenizer.kind = TokenizerKind::Whitespace;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 8);
        assert_eq!(loaded.store.backend, StoreBackend::Local);
        assert_eq!(loaded.tokenizer.kind, TokenizerKind::Whitespace);
        assert_eq!(loaded.reasoner.rules.len(), config.reasoner.rules.len());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[retrieval]\ntop_k = 3\ntimeout_ms = 100\n").unwrap();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.chunking.max_chunk_tokens, 400);
        assert_eq!(config.store.backend, StoreBackend::Qdrant);
    }

    #[test]
    fn test_partial_section_uses_field_defaults() {
        let config: Config = toml::from_str("[store]\nbackend = \"local\"\n").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.store.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.store.collection, DEFAULT_COLLECTION);
    }
}
