// Retrieval-augmented decision pipeline
//
// Components:
// - Retrieval Engine: embed the query and fetch the nearest corpus chunks
// - Reasoner: rule table turning relevant clauses into a coverage verdict
// - Citation: excerpt formatting for justifications
// - Pipeline: parse + retrieve -> reason

pub mod retrieval;
pub mod reasoner;
pub mod citation;
pub mod pipeline;

// Re-export key types
pub use citation::CitationFormat;
pub use pipeline::{PolicyPipeline, QueryReport};
pub use reasoner::{DecisionReasoner, DecisionRule, Evaluation, ReasonerConfig};
pub use retrieval::{RetrievalEngine, SearchParams};
