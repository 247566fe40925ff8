//! Token-window chunking of normalized document text.
//!
//! Text is lowercased and whitespace-collapsed once, at ingestion. Windows of
//! `max_chunk_tokens` tokens advance by `max_chunk_tokens - overlap_tokens`,
//! and the last window is the first one that reaches the end of the text.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

use crate::errors::{PolicyError, Result};
use crate::ingestion::tokenizer::SubwordTokenizer;
use crate::types::Chunk;

/// Chunk window configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Tokens per window
    pub max_chunk_tokens: usize,
    /// Tokens shared by consecutive windows
    pub overlap_tokens: usize,
    /// Trimmed chunks shorter than this (in chars) are dropped
    pub min_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 400,
            overlap_tokens: 50,
            min_chunk_chars: 20,
        }
    }
}

impl ChunkerConfig {
    /// Distance between consecutive window starts
    pub fn step(&self) -> usize {
        self.max_chunk_tokens.saturating_sub(self.overlap_tokens)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_tokens == 0 {
            return Err(PolicyError::ConfigurationError(
                "chunking.max_chunk_tokens must be at least 1".to_string(),
            ));
        }
        if self.step() == 0 {
            return Err(PolicyError::ConfigurationError(format!(
                "chunking.overlap_tokens ({}) must be smaller than max_chunk_tokens ({})",
                self.overlap_tokens, self.max_chunk_tokens
            )));
        }
        Ok(())
    }
}

/// Lowercase and collapse every whitespace run to a single space
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits documents into overlapping token windows
#[derive(Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    tokenizer: Arc<dyn SubwordTokenizer>,
}

impl Chunker {
    /// Create a chunker; invalid window parameters fail here, before any document
    pub fn new(config: ChunkerConfig, tokenizer: Arc<dyn SubwordTokenizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tokenizer })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Normalize and tokenize `text`, returning a lazy stream of chunks.
    ///
    /// Empty or whitespace-only input yields an empty stream.
    pub fn chunk(&self, text: &str, source: &str) -> Result<ChunkStream> {
        let normalized = normalize(text);
        let spans = if normalized.is_empty() {
            Vec::new()
        } else {
            self.tokenizer.spans(&normalized)?
        };

        Ok(ChunkStream {
            text: normalized.into(),
            spans: spans.into(),
            source: source.into(),
            window: self.config.max_chunk_tokens,
            step: self.config.step(),
            min_chars: self.config.min_chunk_chars,
            next_start: 0,
            next_index: 0,
            exhausted: false,
        })
    }

    /// Chunk eagerly
    pub fn chunk_all(&self, text: &str, source: &str) -> Result<Vec<Chunk>> {
        Ok(self.chunk(text, source)?.collect())
    }
}

/// Lazy, finite chunk sequence over one document.
///
/// Cloning yields an independent stream; `rewind` restarts from the first window.
#[derive(Debug, Clone)]
pub struct ChunkStream {
    text: Arc<str>,
    spans: Arc<[Range<usize>]>,
    source: Arc<str>,
    window: usize,
    step: usize,
    min_chars: usize,
    next_start: usize,
    next_index: usize,
    exhausted: bool,
}

impl ChunkStream {
    /// Restart from the first window
    pub fn rewind(&mut self) {
        self.next_start = 0;
        self.next_index = 0;
        self.exhausted = false;
    }

    /// Number of tokens in the normalized document
    pub fn token_count(&self) -> usize {
        self.spans.len()
    }

    /// Normalized document text
    pub fn normalized_text(&self) -> &str {
        &self.text
    }

    /// Next window's trimmed text, or `None` once the end has been reached
    fn next_window(&mut self) -> Option<&str> {
        if self.exhausted || self.next_start >= self.spans.len() {
            self.exhausted = true;
            return None;
        }

        let start = self.next_start;
        let end = (start + self.window).min(self.spans.len());
        if end == self.spans.len() {
            self.exhausted = true;
        } else {
            self.next_start += self.step;
        }

        let bytes = self.spans[start].start..self.spans[end - 1].end;
        Some(self.text[bytes].trim())
    }
}

impl Iterator for ChunkStream {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        loop {
            let min_chars = self.min_chars;
            let text = self.next_window()?;
            if text.chars().count() < min_chars {
                continue;
            }
            let text = text.to_string();
            let chunk = Chunk::new(text, &*self.source, self.next_index);
            self.next_index += 1;
            return Some(chunk);
        }
    }
}
