//! Chunk types flowing from ingestion into the corpus and back out of retrieval

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Metadata key holding the originating document identifier
pub const SOURCE_KEY: &str = "source";

/// Metadata key holding the chunk ordinal within its source
pub const INDEX_KEY: &str = "index";

/// A token-bounded slice of a normalized source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Normalized chunk text
    pub text: String,
    /// Originating document identifier
    pub source: String,
    /// Ordinal within the source
    pub index: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>, index: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            index,
        }
    }

    /// Store payload describing where this chunk came from
    pub fn metadata(&self) -> HashMap<String, JsonValue> {
        let mut metadata = HashMap::new();
        metadata.insert(SOURCE_KEY.to_string(), JsonValue::String(self.source.clone()));
        metadata.insert(INDEX_KEY.to_string(), JsonValue::from(self.index as u64));
        metadata
    }

    /// Rebuild a chunk from text plus store payload.
    ///
    /// Returns `None` unless the payload carries a string source and an
    /// integer index, so retrieval never surfaces a chunk that cannot be traced
    /// back to its place in an ingested document.
    pub fn from_payload(text: String, metadata: &HashMap<String, JsonValue>) -> Option<Self> {
        let source = metadata.get(SOURCE_KEY)?.as_str()?.to_string();
        let Some(index) = metadata.get(INDEX_KEY).and_then(|v| v.as_u64()) else {
            tracing::debug!(
                "Payload from {} has no integer {}: {:?}",
                source,
                INDEX_KEY,
                metadata.get(INDEX_KEY)
            );
            return None;
        };
        Some(Self {
            text,
            source,
            index: index as usize,
        })
    }
}

/// A chunk together with its embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A chunk returned by a nearest-neighbour query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    /// Dissimilarity to the query; smaller is more relevant
    pub distance: f32,
    /// Remaining store payload
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, JsonValue>,
}

impl RetrievedChunk {
    pub fn text(&self) -> &str {
        &self.chunk.text
    }

    pub fn source(&self) -> &str {
        &self.chunk.source
    }
}
