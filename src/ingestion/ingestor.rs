// Corpus rebuild: extract -> chunk -> embed -> replace store contents
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::errors::{PolicyError, Result};
use crate::ingestion::chunker::Chunker;
use crate::ingestion::extract::{ExtractorRegistry, SourceDocument};
use crate::store::{CorpusStore, StoredPoint};
use crate::types::EmbeddedChunk;

/// Counters for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents_seen: usize,
    pub documents_ingested: usize,
    /// Unsupported extension or no extractable text
    pub documents_skipped: usize,
    pub documents_failed: usize,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub embedding_failures: usize,
    pub chunks_stored: usize,
    /// Store count after the rebuild
    pub final_count: u64,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.documents_failed == 0
            && self.embedding_failures == 0
            && self.final_count == self.chunks_stored as u64
    }
}

/// Full-rebuild ingestion into a corpus store.
///
/// Nothing touches the store until every chunk has been embedded, so a run
/// that produces no vectors leaves the previous corpus in place.
pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn CorpusStore>,
    extractors: ExtractorRegistry,
    batch_size: usize,
    progress: ProgressBar,
}

impl Ingestor {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn CorpusStore>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(PolicyError::ConfigurationError(
                "store.batch_size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            chunker,
            embedder,
            store,
            extractors: ExtractorRegistry::default(),
            batch_size,
            progress: ProgressBar::hidden(),
        })
    }

    /// Replace the format registry
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    /// Report embedding progress on this bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Ingest every supported file directly inside `dir` (not recursive)
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            report.documents_seen += 1;

            let Some(extractor) = self.extractors.for_path(&path) else {
                tracing::debug!("Skipping unsupported file {}", path.display());
                report.documents_skipped += 1;
                continue;
            };

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let target = path.clone();
            let extracted = tokio::task::spawn_blocking(move || extractor.extract(&target))
                .await
                .map_err(|e| PolicyError::ExtractionFailure {
                    path: path.clone(),
                    reason: format!("extraction task failed: {}", e),
                })
                .and_then(|result| result);

            match extracted {
                Ok(text) if text.trim().is_empty() => {
                    tracing::warn!("No text extracted from {}", name);
                    report.documents_skipped += 1;
                }
                Ok(text) => {
                    tracing::info!("Extracted {} chars from {}", text.chars().count(), name);
                    documents.push(SourceDocument::new(name, text));
                }
                Err(err) => {
                    tracing::error!("{}", err);
                    report.documents_failed += 1;
                }
            }
        }

        self.rebuild(documents, report).await
    }

    /// Ingest already extracted documents
    pub async fn ingest_documents(&self, documents: Vec<SourceDocument>) -> Result<IngestReport> {
        let report = IngestReport {
            documents_seen: documents.len(),
            ..Default::default()
        };
        self.rebuild(documents, report).await
    }

    async fn rebuild(
        &self,
        documents: Vec<SourceDocument>,
        mut report: IngestReport,
    ) -> Result<IngestReport> {
        let mut chunks = Vec::new();
        for document in &documents {
            let stream = match self.chunker.chunk(&document.text, &document.name) {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::error!("Failed to chunk {}: {}", document.name, err);
                    report.documents_failed += 1;
                    continue;
                }
            };
            let before = chunks.len();
            chunks.extend(stream);
            let produced = chunks.len() - before;
            if produced == 0 {
                report.documents_skipped += 1;
            } else {
                report.documents_ingested += 1;
            }
            tracing::debug!("{} produced {} chunks", document.name, produced);
        }
        report.chunks_created = chunks.len();

        self.progress.set_length(chunks.len() as u64);
        self.progress.set_position(0);

        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match self.embedder.embed(&chunk.text).await {
                Ok(vector) => embedded.push(EmbeddedChunk { chunk, vector }),
                Err(err) => {
                    tracing::warn!(
                        "Dropping chunk {} of {}: {}",
                        chunk.index,
                        chunk.source,
                        err
                    );
                    report.embedding_failures += 1;
                }
            }
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();
        report.chunks_embedded = embedded.len();

        if embedded.is_empty() {
            return Err(PolicyError::NothingToIngest(format!(
                "{} documents, {} chunks, {} embedding failures",
                report.documents_seen, report.chunks_created, report.embedding_failures
            )));
        }

        self.store.clear().await?;
        tracing::info!("Cleared corpus store, writing {} chunks", embedded.len());

        let expected = embedded.len();
        let mut points = embedded
            .into_iter()
            .enumerate()
            .map(|(id, chunk)| StoredPoint::from_embedded(id as u64, chunk));

        let mut batch_number = 0;
        loop {
            let batch: Vec<StoredPoint> = points.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let size = batch.len();

            if let Err(err) = self.store.upsert(batch).await {
                return Err(PolicyError::PartialIngestion {
                    committed: report.chunks_stored,
                    expected,
                    failed_batch: batch_number,
                    reason: err.to_string(),
                });
            }

            report.chunks_stored += size;
            batch_number += 1;
            tracing::debug!("Upserted batch {} ({} chunks)", batch_number, size);
        }

        report.final_count = self.store.count().await?;
        if report.final_count != report.chunks_stored as u64 {
            tracing::warn!(
                "Store holds {} chunks after writing {}",
                report.final_count,
                report.chunks_stored
            );
        }

        tracing::info!(
            "Ingested {} of {} documents into {} chunks",
            report.documents_ingested,
            report.documents_seen,
            report.final_count
        );

        Ok(report)
    }
}
