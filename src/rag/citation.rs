//! Display formatting for cited clauses

/// Cuts clause text down to a readable excerpt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationFormat {
    max_chars: usize,
}

impl CitationFormat {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// First `max_chars` characters, with "..." appended when cut
    pub fn excerpt(&self, text: &str) -> String {
        match text.char_indices().nth(self.max_chars) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }

    /// `<lead>: '<excerpt>'`
    pub fn cite(&self, lead: &str, clause: &str) -> String {
        format!("{}: '{}'", lead, self.excerpt(clause))
    }
}

impl Default for CitationFormat {
    fn default() -> Self {
        Self::new(100)
    }
}
