// Retrieval Engine: embed the query, fetch the nearest chunks
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::embedding::Embedder;
use crate::errors::{PolicyError, Result};
use crate::store::{CorpusStore, ScoredPoint};
use crate::types::{Chunk, RetrievedChunk, INDEX_KEY, SOURCE_KEY};

/// Search parameters for retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Maximum number of chunks to retrieve
    pub top_k: usize,
    /// Deadline for each external call (embedding, store query)
    pub timeout_ms: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            timeout_ms: 30_000,
        }
    }
}

impl SearchParams {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(PolicyError::ConfigurationError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(PolicyError::ConfigurationError(
                "retrieval.timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retrieval engine for semantic search over the chunk corpus
#[derive(Clone)]
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn CorpusStore>,
    params: SearchParams,
}

impl RetrievalEngine {
    /// Create with default parameters
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn CorpusStore>) -> Self {
        Self {
            embedder,
            store,
            params: SearchParams::default(),
        }
    }

    /// Create with custom parameters
    pub fn with_params(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn CorpusStore>,
        params: SearchParams,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            embedder,
            store,
            params,
        })
    }

    /// Retrieve at most `top_k` chunks, closest first.
    ///
    /// An empty corpus yields `Ok(vec![])`. An unreachable embedder or store
    /// yields `RetrievalUnavailable` or `Timeout`, never an empty result.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        let vector = self
            .bounded("query embedding", self.embedder.embed(query))
            .await?;

        let hits = self
            .bounded("corpus query", self.store.query(&vector, self.params.top_k))
            .await?;

        let retrieved = self.to_retrieved(hits);
        tracing::debug!(
            "Retrieved {} chunks for query of {} chars",
            retrieved.len(),
            query.chars().count()
        );

        Ok(retrieved)
    }

    /// Run an external call under the configured deadline, folding every
    /// failure into a query-time retrieval error
    async fn bounded<T>(
        &self,
        stage: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.params.timeout(), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(PolicyError::RetrievalUnavailable(format!("{}: {}", stage, err))),
            Err(_) => Err(PolicyError::Timeout {
                stage: stage.to_string(),
                duration_ms: self.params.timeout_ms,
            }),
        }
    }

    fn to_retrieved(&self, hits: Vec<ScoredPoint>) -> Vec<RetrievedChunk> {
        let mut retrieved: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter_map(|hit| {
                let Some(chunk) = Chunk::from_payload(hit.text, &hit.metadata) else {
                    tracing::warn!(
                        "Dropping point {} without {} and {} payload",
                        hit.id,
                        SOURCE_KEY,
                        INDEX_KEY
                    );
                    return None;
                };
                let mut metadata = hit.metadata;
                metadata.remove(SOURCE_KEY);
                metadata.remove(INDEX_KEY);
                Some(RetrievedChunk {
                    chunk,
                    distance: hit.distance,
                    metadata,
                })
            })
            .collect();

        // stable: equal distances keep store order
        retrieved.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        retrieved.truncate(self.params.top_k);
        retrieved
    }

    /// Number of chunks in the corpus
    pub async fn corpus_size(&self) -> Result<u64> {
        self.bounded("corpus count", self.store.count()).await
    }

    /// Get search parameters
    pub fn params(&self) -> &SearchParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalCorpusStore, StoredPoint};
    use async_trait::async_trait;
    use serde_json::Value as JsonValue;
    use std::collections::HashMap;

    /// Two-dimensional embedder: "covered" leans on x, everything else on y
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("covered") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "axis"
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(PolicyError::EmbeddingFailure("model unavailable".to_string()))
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "broken"
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "slow"
        }
    }

    fn point(id: u64, text: &str, vector: Vec<f32>, source: Option<&str>) -> StoredPoint {
        let mut metadata = HashMap::new();
        if let Some(source) = source {
            metadata.insert("source".to_string(), JsonValue::String(source.to_string()));
            metadata.insert("index".to_string(), JsonValue::from(id));
        }
        StoredPoint {
            id,
            text: text.to_string(),
            metadata,
            vector,
        }
    }

    #[test]
    fn test_search_params_default() {
        let params = SearchParams::default();
        assert_eq!(params.top_k, 5);
        assert_eq!(params.timeout_ms, 30_000);
    }

    #[test]
    fn test_zero_top_k_is_rejected() {
        let result = RetrievalEngine::with_params(
            Arc::new(AxisEmbedder),
            Arc::new(LocalCorpusStore::in_memory()),
            SearchParams { top_k: 0, timeout_ms: 10 },
        );
        assert!(matches!(result, Err(PolicyError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_empty_corpus_is_empty_not_error() {
        let engine = RetrievalEngine::new(Arc::new(AxisEmbedder), Arc::new(LocalCorpusStore::in_memory()));
        assert!(engine.retrieve("is knee surgery covered").await.unwrap().is_empty());
        assert_eq!(engine.corpus_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_results_ascend_and_respect_top_k() {
        let store = Arc::new(LocalCorpusStore::in_memory());
        store
            .upsert(vec![
                point(0, "dental is excluded", vec![0.0, 1.0], Some("a.pdf")),
                point(1, "knee surgery is covered", vec![1.0, 0.0], Some("a.pdf")),
                point(2, "ambulance charges", vec![0.7, 0.7], Some("b.pdf")),
            ])
            .await
            .unwrap();

        let engine = RetrievalEngine::with_params(
            Arc::new(AxisEmbedder),
            store,
            SearchParams { top_k: 2, timeout_ms: 1_000 },
        )
        .unwrap();

        let chunks = engine.retrieve("covered?").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text(), "knee surgery is covered");
        assert_eq!(chunks[1].text(), "ambulance charges");
        assert!(chunks[0].distance <= chunks[1].distance);
        assert_eq!(chunks[1].source(), "b.pdf");
    }

    #[tokio::test]
    async fn test_points_without_source_are_dropped() {
        let store = Arc::new(LocalCorpusStore::in_memory());
        store
            .upsert(vec![
                point(0, "orphan covered text", vec![1.0, 0.0], None),
                point(1, "traceable covered text", vec![0.9, 0.1], Some("a.pdf")),
            ])
            .await
            .unwrap();

        let engine = RetrievalEngine::new(Arc::new(AxisEmbedder), store);
        let chunks = engine.retrieve("covered").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source(), "a.pdf");
        assert!(chunks[0].metadata.is_empty());
    }

    #[tokio::test]
    async fn test_embedder_failure_is_retrieval_unavailable() {
        let engine = RetrievalEngine::new(Arc::new(BrokenEmbedder), Arc::new(LocalCorpusStore::in_memory()));
        let err = engine.retrieve("anything").await.unwrap_err();
        assert!(matches!(err, PolicyError::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_embedder_times_out() {
        let engine = RetrievalEngine::with_params(
            Arc::new(SlowEmbedder),
            Arc::new(LocalCorpusStore::in_memory()),
            SearchParams { top_k: 5, timeout_ms: 20 },
        )
        .unwrap();
        let err = engine.retrieve("anything").await.unwrap_err();
        assert!(matches!(err, PolicyError::Timeout { .. }));
        assert!(err.is_retrieval_failure());
    }
}
