//! Structured view of a free-text insurance query

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender cue extracted from a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

/// Fields extracted from a query. Every field is optional; `None` means the
/// pattern did not match, which is never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub procedure: Option<String>,
    pub location: Option<String>,
    pub policy_duration: Option<String>,
    pub original_text: String,
}

impl ParsedQuery {
    /// Empty parse of the given text
    pub fn empty(original_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            ..Default::default()
        }
    }

    /// Number of fields that were extracted
    pub fn extracted_fields(&self) -> usize {
        [
            self.age.is_some(),
            self.gender.is_some(),
            self.procedure.is_some(),
            self.location.is_some(),
            self.policy_duration.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_parse() {
        let parsed = ParsedQuery::empty("hello");
        assert_eq!(parsed.original_text, "hello");
        assert_eq!(parsed.extracted_fields(), 0);
    }

    #[test]
    fn test_gender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
        assert_eq!(Gender::Male.to_string(), "male");
    }
}
