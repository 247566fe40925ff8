// Corpus store backed by a Qdrant collection
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        point_id::PointIdOptions, value::Kind, vectors_config::Config,
        with_payload_selector::SelectorOptions, CreateCollection, Distance, PointId, PointStruct,
        SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::errors::{PolicyError, Result};
use crate::store::{CorpusStore, ScoredPoint, StoredPoint};

/// Payload key holding the chunk text
const TEXT_KEY: &str = "document";

/// Qdrant collection with cosine similarity
pub struct QdrantCorpusStore {
    client: QdrantClient,
    collection: String,
    dimension: u64,
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> PolicyError {
    PolicyError::StoreUnavailable(format!("{}: {}", context, err))
}

impl QdrantCorpusStore {
    /// Connect and make sure the collection exists
    pub async fn connect(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| unavailable("Failed to create Qdrant client", e))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension: dimension as u64,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| unavailable("Failed to list collections", e))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            return Ok(());
        }

        self.client
            .create_collection(&CreateCollection {
                collection_name: self.collection.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: self.dimension,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| unavailable(&format!("Failed to create collection {}", self.collection), e))?;

        tracing::info!("Created Qdrant collection {}", self.collection);
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for QdrantCorpusStore {
    async fn upsert(&self, batch: Vec<StoredPoint>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = batch
            .into_iter()
            .map(|point| {
                let mut payload: HashMap<String, QdrantValue> = point
                    .metadata
                    .into_iter()
                    .map(|(key, value)| (key, json_to_qdrant_value(value)))
                    .collect();
                payload.insert(TEXT_KEY.to_string(), QdrantValue::from(point.text));
                PointStruct::new(point.id, point.vector, payload)
            })
            .collect();

        self.client
            .upsert_points_blocking(&self.collection, None, points, None)
            .await
            .map_err(|e| unavailable("Failed to upsert points", e))?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPoint>> {
        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: vector.to_vec(),
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| unavailable("Failed to search points", e))?;

        let hits = response
            .result
            .into_iter()
            .map(|point| {
                let mut text = String::new();
                let mut metadata = HashMap::new();
                for (key, value) in point.payload {
                    if key == TEXT_KEY {
                        text = qdrant_value_to_string(&value).unwrap_or_default();
                    } else if let Some(json) = qdrant_to_json_value(&value) {
                        metadata.insert(key, json);
                    }
                }

                ScoredPoint {
                    id: point_id_to_u64(&point.id),
                    text,
                    metadata,
                    // cosine similarity -> distance
                    distance: 1.0 - point.score,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| unavailable("Failed to get collection info", e))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    async fn clear(&self) -> Result<()> {
        if self.collection_exists().await? {
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(|e| unavailable(&format!("Failed to delete collection {}", self.collection), e))?;
            tracing::info!("Deleted existing collection {}", self.collection);
        }

        self.ensure_collection().await
    }
}

// Helper functions for type conversions
fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else if let Some(f) = n.as_f64() {
                QdrantValue::from(f)
            } else {
                QdrantValue::from(0)
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        _ => QdrantValue::from(""),
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        _ => None,
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

fn point_id_to_u64(point_id: &Option<PointId>) -> u64 {
    match point_id.as_ref().and_then(|id| id.point_id_options.as_ref()) {
        Some(PointIdOptions::Num(n)) => *n,
        _ => u64::MAX,
    }
}
