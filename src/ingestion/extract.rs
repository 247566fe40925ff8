//! Raw text extraction from policy documents.
//!
//! Extractors are opaque text producers. Unreadable input is an
//! `ExtractionFailure`; readable input with no text is an empty string.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use crate::errors::{PolicyError, Result};

/// A document reduced to plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Document identifier recorded on every chunk (the file name)
    pub name: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Produces plain text from one file format
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

fn failure(path: &Path, reason: impl ToString) -> PolicyError {
    PolicyError::ExtractionFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// UTF-8 text files
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| failure(path, e))
    }
}

/// PDF via the `pdftotext` system binary (poppler-utils)
#[derive(Debug)]
pub struct PdfExtractor {
    binary: String,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self {
            binary: "pdftotext".to_string(),
        }
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| failure(path, format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(failure(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// DOCX: paragraph text from `word/document.xml`, one line per paragraph
#[derive(Debug, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    fn paragraphs(xml: &str) -> std::result::Result<String, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        let mut text = String::new();
        let mut in_run_text = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
                Event::End(e) => match e.name().as_ref() {
                    b"w:t" => in_run_text = false,
                    b"w:p" => text.push('\n'),
                    _ => {}
                },
                Event::Empty(e) if e.name().as_ref() == b"w:tab" => text.push(' '),
                Event::Text(t) if in_run_text => text.push_str(&t.unescape()?),
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(text)
    }
}

impl TextExtractor for DocxExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let file = fs::File::open(path).map_err(|e| failure(path, e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| failure(path, e))?;

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| failure(path, e))?
            .read_to_string(&mut xml)
            .map_err(|e| failure(path, e))?;

        Self::paragraphs(&xml).map_err(|e| failure(path, e))
    }
}

/// Extension-keyed extractor lookup
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// Registry with no formats
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register an extractor for a file extension (case-insensitive)
    pub fn register(&mut self, extension: &str, extractor: Arc<dyn TextExtractor>) {
        self.extractors
            .insert(extension.to_ascii_lowercase(), extractor);
    }

    /// Extractor for a path, if its extension is supported
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn TextExtractor>> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extractors.get(&extension).cloned()
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("pdf", Arc::new(PdfExtractor::default()));
        registry.register("docx", Arc::new(DocxExtractor));
        let plain: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);
        registry.register("txt", plain.clone());
        registry.register("md", plain);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_registry_dispatch() {
        let registry = ExtractorRegistry::default();
        assert!(registry.supports(Path::new("policy.PDF")));
        assert!(registry.supports(Path::new("policy.docx")));
        assert!(registry.supports(Path::new("notes.txt")));
        assert!(!registry.supports(Path::new("scan.png")));
        assert!(!registry.supports(Path::new("README")));
    }

    #[test]
    fn test_plain_text_extraction() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.txt");
        fs::write(&path, "Cataract surgery is covered.").unwrap();

        let text = PlainTextExtractor.extract(&path).unwrap();
        assert_eq!(text, "Cataract surgery is covered.");
    }

    #[test]
    fn test_missing_file_is_extraction_failure() {
        let err = PlainTextExtractor
            .extract(Path::new("/nonexistent/policy.txt"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::ExtractionFailure { .. }));
    }

    #[test]
    fn test_docx_paragraph_text() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Knee surgery</w:t></w:r><w:r><w:t xml:space="preserve"> is covered</w:t></w:r></w:p>
            <w:p><w:r><w:t>Cosmetic &amp; dental excluded</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = DocxExtractor::paragraphs(xml).unwrap();
        assert_eq!(text, "Knee surgery is covered\nCosmetic & dental excluded\n");
    }

    #[test]
    fn test_docx_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.docx");
        {
            let file = fs::File::create(&path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file(
                    "word/document.xml",
                    zip::write::SimpleFileOptions::default(),
                )
                .unwrap();
            writer
                .write_all(b"<w:document><w:body><w:p><w:r><w:t>Maternity is eligible</w:t></w:r></w:p></w:body></w:document>")
                .unwrap();
            writer.finish().unwrap();
        }

        let text = DocxExtractor.extract(&path).unwrap();
        assert_eq!(text.trim(), "Maternity is eligible");
    }

    #[test]
    fn test_corrupt_docx_is_extraction_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(
            DocxExtractor.extract(&path),
            Err(PolicyError::ExtractionFailure { .. })
        ));
    }
}
