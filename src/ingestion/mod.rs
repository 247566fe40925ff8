//! Offline ingestion: extract document text, chunk it into overlapping
//! token windows, embed every chunk and rebuild the corpus store.

pub mod tokenizer;
pub mod chunker;
pub mod extract;
pub mod ingestor;

// Re-export key types
pub use chunker::{normalize, ChunkStream, Chunker, ChunkerConfig};
pub use extract::{ExtractorRegistry, SourceDocument, TextExtractor};
pub use ingestor::{IngestReport, Ingestor};
pub use tokenizer::{HfTokenizer, SubwordTokenizer, WhitespaceTokenizer};
