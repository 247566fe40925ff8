//! Component assembly for PolicyLens
//!
//! Turns a validated `Config` into the tokenizer, embedder, store, pipeline
//! and ingestor the CLI works with. Model downloads run on the blocking pool.

use std::sync::Arc;

use crate::answer::{Answerer, OllamaAnswerer};
use crate::config::{Config, StoreBackend, StoreConfig, TokenizerConfig, TokenizerKind};
use crate::embedding::{CandleEmbedder, Embedder};
use crate::errors::{PolicyError, Result};
use crate::ingestion::{Chunker, HfTokenizer, Ingestor, SubwordTokenizer, WhitespaceTokenizer};
use crate::rag::PolicyPipeline;
use crate::store::{CorpusStore, LocalCorpusStore, QdrantCorpusStore};

async fn blocking<T, F>(what: &str, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| PolicyError::ConfigurationError(format!("{} loader panicked: {}", what, e)))?
}

/// Tokenizer selected by `[tokenizer] kind`
pub async fn build_tokenizer(config: &TokenizerConfig) -> Result<Arc<dyn SubwordTokenizer>> {
    match config.kind {
        TokenizerKind::Whitespace => Ok(Arc::new(WhitespaceTokenizer::new())),
        TokenizerKind::Huggingface => {
            let model_id = config.model_id.clone();
            let tokenizer = blocking("tokenizer", move || HfTokenizer::from_hub(&model_id)).await?;
            tracing::info!("Loaded tokenizer {}", config.model_id);
            Ok(Arc::new(tokenizer))
        }
    }
}

/// Sentence embedder from the HuggingFace hub
pub async fn build_embedder(model_id: &str) -> Result<Arc<dyn Embedder>> {
    let id = model_id.to_string();
    let embedder = blocking("embedding model", move || CandleEmbedder::from_hub(&id)).await?;
    tracing::info!(
        "Loaded embedding model {} ({} dimensions)",
        model_id,
        embedder.dimension()
    );
    Ok(Arc::new(embedder))
}

/// Corpus store selected by `[store] backend`
pub async fn build_store(config: &StoreConfig, dimension: usize) -> Result<Arc<dyn CorpusStore>> {
    match config.backend {
        StoreBackend::Qdrant => {
            let store = QdrantCorpusStore::connect(&config.url, &config.collection, dimension).await?;
            tracing::debug!("Connected to Qdrant at {}", config.url);
            Ok(Arc::new(store))
        }
        StoreBackend::Local => {
            let path = config
                .local_path()
                .map_err(|e| PolicyError::ConfigurationError(e.to_string()))?;
            let store = LocalCorpusStore::open(path.clone()).await?;
            tracing::debug!("Opened local corpus at {}", path.display());
            Ok(Arc::new(store))
        }
    }
}

/// Embedder and store, shared by ingestion and querying
pub struct Components {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn CorpusStore>,
}

impl Components {
    pub async fn load(config: &Config) -> Result<Self> {
        config.validate()?;
        let embedder = build_embedder(&config.embedding.model_id).await?;
        let store = build_store(&config.store, embedder.dimension()).await?;
        Ok(Self { embedder, store })
    }

    pub fn pipeline(&self, config: &Config) -> Result<PolicyPipeline> {
        PolicyPipeline::with_config(
            self.embedder.clone(),
            self.store.clone(),
            config.retrieval.clone(),
            config.reasoner.clone(),
        )
    }

    pub async fn ingestor(&self, config: &Config) -> Result<Ingestor> {
        let tokenizer = build_tokenizer(&config.tokenizer).await?;
        let chunker = Chunker::new(config.chunking.clone(), tokenizer)?;
        Ingestor::new(
            chunker,
            self.embedder.clone(),
            self.store.clone(),
            config.store.batch_size,
        )
    }
}

/// Free-text answerer from `[answerer]`
pub fn build_answerer(config: &Config) -> Result<Arc<dyn Answerer>> {
    let answerer = OllamaAnswerer::with_config(&config.answerer.ollama_url, &config.answerer.model)?;
    Ok(Arc::new(answerer))
}
