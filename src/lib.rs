//! PolicyLens - insurance coverage decisions from policy documents
//!
//! Retrieval-augmented decision pipeline:
//!
//! - **Ingestion**: extract text, chunk into overlapping token windows,
//!   embed and rebuild the corpus store
//! - **Query**: parse the query and retrieve the closest chunks concurrently,
//!   then let the rule-based reasoner issue a `Decision`
//! - **Answer**: optional free-text answer for display only

pub mod errors;
pub mod types;
pub mod config;
pub mod cli;
pub mod logging;
pub mod bootstrap;

// Ingestion side
pub mod ingestion;
pub mod embedding;
pub mod store;

// Query side
pub mod query;
pub mod rag;
pub mod answer;

// Re-export commonly used types
pub use errors::{PolicyError, Result};
pub use rag::{PolicyPipeline, QueryReport};
pub use types::{Decision, ParsedQuery, RetrievedChunk, Verdict};
