//! Free-text answerer.
//!
//! Produces a display string from the question and the retrieved clauses.
//! Its output never reaches the decision reasoner.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::RetrievedChunk;

pub use client::{OllamaAnswerer, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

/// Human-readable answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Model confidence, when the backend reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer>;
}

/// Join chunk texts into one context block, closest first
pub fn context_from(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
