//! Shallow structured extraction from free-text queries

pub mod parser;

pub use parser::{Extracted, ExtractionRule, Field, QueryParser};
