//! Type definitions module
//!
//! Data model shared by ingestion, retrieval and reasoning.

pub mod chunk;
pub mod query;
pub mod decision;

// Re-export commonly used types
pub use chunk::{Chunk, EmbeddedChunk, RetrievedChunk, INDEX_KEY, SOURCE_KEY};
pub use decision::{Decision, Verdict, AMOUNT_NOT_COMPUTED};
pub use query::{Gender, ParsedQuery};
