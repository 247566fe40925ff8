// Brute-force corpus store kept in memory, optionally snapshotted to JSON
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::errors::{PolicyError, Result};
use crate::store::{cosine_distance, CorpusStore, ScoredPoint, StoredPoint};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    points: Vec<StoredPoint>,
}

/// Points in insertion order, indexed by id
#[derive(Default)]
struct Points {
    items: Vec<StoredPoint>,
    positions: HashMap<u64, usize>,
}

impl Points {
    fn from_vec(items: Vec<StoredPoint>) -> Self {
        let mut points = Self::default();
        for point in items {
            points.upsert(point);
        }
        points
    }

    fn upsert(&mut self, point: StoredPoint) {
        match self.positions.get(&point.id) {
            Some(&at) => self.items[at] = point,
            None => {
                self.positions.insert(point.id, self.items.len());
                self.items.push(point);
            }
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }
}

/// In-process corpus store with exact cosine search
pub struct LocalCorpusStore {
    points: RwLock<Points>,
    path: Option<PathBuf>,
}

impl LocalCorpusStore {
    /// Volatile store
    pub fn in_memory() -> Self {
        Self {
            points: RwLock::new(Points::default()),
            path: None,
        }
    }

    /// Store backed by a snapshot file, loading it if present
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let points = if tokio::fs::try_exists(&path).await? {
            let data = tokio::fs::read_to_string(&path).await?;
            let snapshot: Snapshot = serde_json::from_str(&data)?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(PolicyError::StoreUnavailable(format!(
                    "Unsupported snapshot version {} in {}",
                    snapshot.version,
                    path.display()
                )));
            }
            tracing::info!("Loaded {} points from {}", snapshot.points.len(), path.display());
            snapshot.points
        } else {
            Vec::new()
        };

        Ok(Self {
            points: RwLock::new(Points::from_vec(points)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the snapshot to a temp file and rename it over the old one
    async fn persist(&self, points: &[StoredPoint]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        #[derive(Serialize)]
        struct SnapshotRef<'a> {
            version: u32,
            points: &'a [StoredPoint],
        }

        let data = serde_json::to_string(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            points,
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| PolicyError::StoreUnavailable(format!("Failed to write snapshot: {}", e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| PolicyError::StoreUnavailable(format!("Failed to replace snapshot: {}", e)))?;

        tracing::debug!("Saved {} points to {}", points.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for LocalCorpusStore {
    async fn upsert(&self, batch: Vec<StoredPoint>) -> Result<()> {
        let mut points = self.points.write().await;
        for point in batch {
            points.upsert(point);
        }
        self.persist(&points.items).await
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPoint>> {
        let points = self.points.read().await;

        let mut scored: Vec<ScoredPoint> = points
            .items
            .iter()
            .map(|p| ScoredPoint {
                id: p.id,
                text: p.text.clone(),
                metadata: p.metadata.clone(),
                distance: cosine_distance(vector, &p.vector),
            })
            .collect();

        // ties broken by id so results are stable
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        scored.truncate(k);

        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.points.read().await.items.len() as u64)
    }

    async fn clear(&self) -> Result<()> {
        let mut points = self.points.write().await;
        points.clear();
        self.persist(&points.items).await
    }
}
