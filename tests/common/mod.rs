//! Shared fakes for integration tests: no model downloads, no Qdrant.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use policylens::embedding::Embedder;
use policylens::errors::{PolicyError, Result};
use policylens::ingestion::{Chunker, ChunkerConfig, Ingestor, WhitespaceTokenizer};
use policylens::store::{CorpusStore, LocalCorpusStore, ScoredPoint, StoredPoint};

pub const REFERENCE_QUERY: &str =
    "46-year-old male, knee surgery in Pune, 3-month-old insurance policy";

/// Bag-of-words embedder: each lowercased word hashes into one of 64 buckets
pub struct HashingEmbedder;

impl HashingEmbedder {
    const DIMENSION: usize = 64;
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; Self::DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % Self::DIMENSION as u64) as usize] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn model_id(&self) -> &str {
        "hashing-bow"
    }
}

/// Local store whose upserts start failing after `healthy_batches`
pub struct FlakyStore {
    inner: LocalCorpusStore,
    healthy_batches: usize,
    upserts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(healthy_batches: usize) -> Self {
        Self {
            inner: LocalCorpusStore::in_memory(),
            healthy_batches,
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CorpusStore for FlakyStore {
    async fn upsert(&self, batch: Vec<StoredPoint>) -> Result<()> {
        if self.upserts.fetch_add(1, Ordering::SeqCst) >= self.healthy_batches {
            return Err(PolicyError::StoreUnavailable("connection reset".into()));
        }
        self.inner.upsert(batch).await
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPoint>> {
        self.inner.query(vector, k).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Ingestor over the whitespace tokenizer and hashing embedder
pub fn ingestor(store: Arc<dyn CorpusStore>, config: ChunkerConfig, batch_size: usize) -> Ingestor {
    let chunker = Chunker::new(config, Arc::new(WhitespaceTokenizer::new())).unwrap();
    Ingestor::new(chunker, Arc::new(HashingEmbedder), store, batch_size).unwrap()
}
