//! Corpus storage: chunks, their payload and vectors, with nearest-neighbour
//! queries. Two backends: a Qdrant collection and a local snapshot file.

pub mod qdrant;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::errors::Result;
use crate::types::EmbeddedChunk;

pub use local::LocalCorpusStore;
pub use qdrant::QdrantCorpusStore;

/// One stored point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPoint {
    pub id: u64,
    pub text: String,
    pub metadata: HashMap<String, JsonValue>,
    pub vector: Vec<f32>,
}

impl StoredPoint {
    pub fn from_embedded(id: u64, embedded: EmbeddedChunk) -> Self {
        let metadata = embedded.chunk.metadata();
        Self {
            id,
            text: embedded.chunk.text,
            metadata,
            vector: embedded.vector,
        }
    }
}

/// A query hit, ordered by ascending distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: u64,
    pub text: String,
    pub metadata: HashMap<String, JsonValue>,
    pub distance: f32,
}

/// Persistent chunk corpus.
///
/// Implementations must tolerate concurrent reads from in-flight queries.
/// Unreachable backends report `StoreUnavailable`.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Insert or replace points by id
    async fn upsert(&self, batch: Vec<StoredPoint>) -> Result<()>;

    /// Up to `k` nearest points, closest first
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPoint>>;

    /// Number of stored points
    async fn count(&self) -> Result<u64>;

    /// Remove every point
    async fn clear(&self) -> Result<()>;
}

/// Cosine distance (`1 - cosine similarity`); zero vectors are maximally distant
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
