// End-to-end query pipeline: parse + retrieve -> reason
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::answer::Answer;
use crate::embedding::Embedder;
use crate::errors::Result;
use crate::query::QueryParser;
use crate::rag::reasoner::{DecisionReasoner, ReasonerConfig};
use crate::rag::retrieval::{RetrievalEngine, SearchParams};
use crate::store::CorpusStore;
use crate::types::{Decision, ParsedQuery, RetrievedChunk};

/// Pipeline result with the parsed query kept for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub query: String,
    pub parsed: ParsedQuery,
    pub decision: Decision,
    /// Evidence, closest first, whether or not a verdict was reached
    pub chunks: Vec<RetrievedChunk>,
}

impl QueryReport {
    /// Decision keys at the top level, plus `Query`, `Parsed`, `Chunks`
    /// and, when given, `Answer`
    pub fn to_json(&self, answer: Option<&Answer>) -> Result<serde_json::Value> {
        let mut output = serde_json::to_value(&self.decision)?;
        output["Query"] = serde_json::Value::String(self.query.clone());
        output["Parsed"] = serde_json::to_value(&self.parsed)?;
        output["Chunks"] = serde_json::to_value(&self.chunks)?;
        if let Some(answer) = answer {
            output["Answer"] = serde_json::to_value(answer)?;
        }
        Ok(output)
    }
}

/// Query surface: one call from raw text to decision plus evidence.
///
/// Holds only read-only collaborators, so one instance can serve many
/// concurrent queries.
pub struct PolicyPipeline {
    parser: QueryParser,
    retrieval_engine: RetrievalEngine,
    reasoner: DecisionReasoner,
}

impl PolicyPipeline {
    /// Assemble from already constructed parts
    pub fn new(parser: QueryParser, retrieval_engine: RetrievalEngine, reasoner: DecisionReasoner) -> Self {
        Self {
            parser,
            retrieval_engine,
            reasoner,
        }
    }

    /// Build the standard pipeline over injected embedder and store
    pub fn with_config(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn CorpusStore>,
        search: SearchParams,
        reasoner: ReasonerConfig,
    ) -> Result<Self> {
        Ok(Self {
            parser: QueryParser::new()?,
            retrieval_engine: RetrievalEngine::with_params(embedder, store, search)?,
            reasoner: DecisionReasoner::new(reasoner)?,
        })
    }

    /// Decision plus the supporting chunks.
    ///
    /// Retrieval failures propagate; an empty corpus gives `Undetermined`.
    pub async fn process(&self, query: &str) -> Result<(Decision, Vec<RetrievedChunk>)> {
        let report = self.process_detailed(query).await?;
        Ok((report.decision, report.chunks))
    }

    /// Like `process`, also returning the parsed query
    pub async fn process_detailed(&self, query: &str) -> Result<QueryReport> {
        // parsing and retrieval share no state
        let (parsed, retrieved) = tokio::join!(
            async { self.parser.parse(query) },
            self.retrieval_engine.retrieve(query),
        );
        let chunks = retrieved?;

        let decision = self.reasoner.reason(&parsed, &chunks);
        tracing::info!(
            "Query decided {} from {} chunks ({} applicable)",
            decision.verdict,
            chunks.len(),
            decision.applicable_clauses.len()
        );

        Ok(QueryReport {
            query: query.to_string(),
            parsed,
            decision,
            chunks,
        })
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    pub fn retrieval_engine(&self) -> &RetrievalEngine {
        &self.retrieval_engine
    }

    pub fn reasoner(&self) -> &DecisionReasoner {
        &self.reasoner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PolicyError;
    use crate::store::{LocalCorpusStore, ScoredPoint, StoredPoint};
    use crate::types::{Chunk, EmbeddedChunk, Verdict};
    use async_trait::async_trait;

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "constant"
        }
    }

    struct DownStore;

    #[async_trait]
    impl CorpusStore for DownStore {
        async fn upsert(&self, _batch: Vec<StoredPoint>) -> Result<()> {
            Err(PolicyError::StoreUnavailable("down".into()))
        }

        async fn query(&self, _vector: &[f32], _k: usize) -> Result<Vec<ScoredPoint>> {
            Err(PolicyError::StoreUnavailable("down".into()))
        }

        async fn count(&self) -> Result<u64> {
            Err(PolicyError::StoreUnavailable("down".into()))
        }

        async fn clear(&self) -> Result<()> {
            Err(PolicyError::StoreUnavailable("down".into()))
        }
    }

    fn pipeline(store: Arc<dyn CorpusStore>) -> PolicyPipeline {
        PolicyPipeline::with_config(
            Arc::new(ConstantEmbedder),
            store,
            SearchParams::default(),
            ReasonerConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_corpus_is_undetermined() {
        let pipeline = pipeline(Arc::new(LocalCorpusStore::in_memory()));
        let (decision, chunks) = pipeline
            .process("46-year-old male, knee surgery in Pune, 3-month-old insurance policy")
            .await
            .unwrap();
        assert!(chunks.is_empty());
        assert_eq!(decision.verdict, Verdict::Undetermined);
    }

    #[tokio::test]
    async fn test_store_failure_is_distinguishable() {
        let pipeline = pipeline(Arc::new(DownStore));
        let err = pipeline.process("knee surgery").await.unwrap_err();
        assert!(err.is_retrieval_failure());
    }

    #[tokio::test]
    async fn test_detailed_report_keeps_parse() {
        let pipeline = pipeline(Arc::new(LocalCorpusStore::in_memory()));
        let report = pipeline
            .process_detailed("female, cataract surgery in Chennai")
            .await
            .unwrap();
        assert_eq!(report.parsed.procedure.as_deref(), Some("cataract surgery"));
        assert_eq!(report.query, "female, cataract surgery in Chennai");
    }

    #[tokio::test]
    async fn test_report_json_carries_evidence() {
        let store = Arc::new(LocalCorpusStore::in_memory());
        store
            .upsert(vec![StoredPoint::from_embedded(
                0,
                EmbeddedChunk {
                    chunk: Chunk::new("cataract surgery is covered after 24 months", "policy.pdf", 0),
                    vector: vec![1.0, 0.0],
                },
            )])
            .await
            .unwrap();
        let report = pipeline(store)
            .process_detailed("female, cataract surgery in Chennai")
            .await
            .unwrap();

        let json = report.to_json(None).unwrap();
        assert!(json["Decision"].is_string());
        assert_eq!(json["Query"], "female, cataract surgery in Chennai");
        assert_eq!(json["Parsed"]["procedure"], "cataract surgery");
        assert_eq!(json["Chunks"][0]["source"], "policy.pdf");
        assert!(json.get("Answer").is_none());
    }
}
