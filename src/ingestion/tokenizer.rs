//! Sub-word tokenization reported as byte spans.
//!
//! The chunker never decodes token ids. A window of tokens maps back to the
//! normalized text by slicing from the first token's start offset to the last
//! token's end offset, so overlapping windows share exactly the same bytes.

use anyhow::Context;
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::ops::Range;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::errors::{PolicyError, Result};

/// Splits text into an ordered sequence of token byte spans
pub trait SubwordTokenizer: Send + Sync {
    /// Byte ranges of each token, in order, all on char boundaries
    fn spans(&self, text: &str) -> Result<Vec<Range<usize>>>;

    /// Human-readable tokenizer name for logs
    fn name(&self) -> &str;
}

/// HuggingFace `tokenizers` model fetched from the hub
pub struct HfTokenizer {
    tokenizer: Arc<Tokenizer>,
    model_id: String,
}

impl HfTokenizer {
    /// Download (or reuse the cached) `tokenizer.json` for a hub repo
    pub fn from_hub(model_id: &str) -> Result<Self> {
        let path = Api::new()
            .context("Failed to create HuggingFace API client")
            .and_then(|api| {
                api.repo(Repo::new(model_id.to_string(), RepoType::Model))
                    .get("tokenizer.json")
                    .context("Failed to download tokenizer")
            })
            .map_err(|e| PolicyError::TokenizerError(format!("{:#}", e)))?;

        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| PolicyError::TokenizerError(format!("Failed to load tokenizer: {}", e)))?;

        Ok(Self::from_tokenizer(tokenizer, model_id))
    }

    /// Wrap an already constructed tokenizer
    pub fn from_tokenizer(tokenizer: Tokenizer, model_id: &str) -> Self {
        Self {
            tokenizer: Arc::new(tokenizer),
            model_id: model_id.to_string(),
        }
    }
}

impl SubwordTokenizer for HfTokenizer {
    fn spans(&self, text: &str) -> Result<Vec<Range<usize>>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| PolicyError::TokenizerError(format!("Tokenization failed: {}", e)))?;

        let spans = encoding
            .get_offsets()
            .iter()
            .map(|&(start, end)| {
                floor_char_boundary(text, start)..ceil_char_boundary(text, end)
            })
            .collect();

        Ok(spans)
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}

/// Whitespace-delimited tokens; needs no model download
#[derive(Debug, Clone, Default)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl SubwordTokenizer for WhitespaceTokenizer {
    fn spans(&self, text: &str) -> Result<Vec<Range<usize>>> {
        let mut spans = Vec::new();
        let mut start = None;

        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    spans.push(s..i);
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            spans.push(s..text.len());
        }

        Ok(spans)
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
