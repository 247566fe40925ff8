//! Text embedding.
//!
//! `Embedder` is the seam between the pipeline and the model; the candle
//! BERT engine is the production implementation.

pub mod engine;

use async_trait::async_trait;

use crate::errors::Result;

pub use engine::CandleEmbedder;

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic per model version and safe for
/// concurrent use. Failures are errors, never a zero vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Model identifier, recorded in logs
    fn model_id(&self) -> &str;
}
