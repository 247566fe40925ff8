//! Rule-based coverage reasoning over retrieved clauses.
//!
//! Chunks are scanned in retrieval order. A chunk is relevant when it mentions
//! the parsed procedure. The first relevant chunk matching a rule decides the
//! verdict and the scan stops there; rules are tried in table order, so an
//! exclusion phrase outranks an approval phrase within the same chunk. Later
//! chunks are never consulted once a verdict is reached, even if they would
//! contradict it.

use serde::{Deserialize, Serialize};

use crate::errors::{PolicyError, Result};
use crate::rag::citation::CitationFormat;
use crate::types::{Decision, ParsedQuery, RetrievedChunk, Verdict, AMOUNT_NOT_COMPUTED};

/// Justification when no rule fires
pub const UNDETERMINED_JUSTIFICATION: &str =
    "Insufficient context to confidently determine eligibility.";

/// Trigger phrases mapped to a verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRule {
    pub verdict: Verdict,
    /// Matched case-insensitively as substrings of the chunk text
    pub triggers: Vec<String>,
    /// Lead-in for the justification citing the deciding clause
    pub justification: String,
}

impl DecisionRule {
    pub fn new(verdict: Verdict, triggers: &[&str], justification: &str) -> Self {
        Self {
            verdict,
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            justification: justification.to_string(),
        }
    }

    fn matches(&self, lowered_text: &str) -> bool {
        self.triggers.iter().any(|t| lowered_text.contains(t.as_str()))
    }
}

/// Standard rule table: exclusions before approvals
pub fn default_rules() -> Vec<DecisionRule> {
    vec![
        DecisionRule::new(
            Verdict::Rejected,
            &["not covered", "excluded"],
            "Procedure appears to be excluded based on clause",
        ),
        DecisionRule::new(
            Verdict::Approved,
            &["covered", "eligible"],
            "Procedure seems eligible under clause",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Evaluated in order; first matching rule wins
    pub rules: Vec<DecisionRule>,
    /// Citation excerpt length in characters
    pub excerpt_chars: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            excerpt_chars: 100,
        }
    }
}

impl ReasonerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(PolicyError::ConfigurationError(
                "reasoner.rules must contain at least one rule".to_string(),
            ));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.verdict == Verdict::Undetermined {
                return Err(PolicyError::ConfigurationError(format!(
                    "reasoner.rules[{}] cannot map to Undetermined",
                    i
                )));
            }
            if rule.triggers.is_empty() || rule.triggers.iter().any(|t| t.trim().is_empty()) {
                return Err(PolicyError::ConfigurationError(format!(
                    "reasoner.rules[{}] needs non-empty trigger phrases",
                    i
                )));
            }
        }
        if self.excerpt_chars == 0 {
            return Err(PolicyError::ConfigurationError(
                "reasoner.excerpt_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a scan, before display formatting
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<'a> {
    pub verdict: Verdict,
    /// Rule and chunk that produced a decisive verdict
    pub deciding: Option<(&'a DecisionRule, &'a RetrievedChunk)>,
    /// Every relevant chunk seen, in scan order
    pub clauses: Vec<&'a RetrievedChunk>,
}

/// Converts parsed query plus retrieved clauses into a decision
#[derive(Debug, Clone)]
pub struct DecisionReasoner {
    rules: Vec<DecisionRule>,
    citation: CitationFormat,
}

impl DecisionReasoner {
    pub fn new(config: ReasonerConfig) -> Result<Self> {
        config.validate()?;

        let rules = config
            .rules
            .into_iter()
            .map(|mut rule| {
                rule.triggers = rule.triggers.iter().map(|t| t.to_lowercase()).collect();
                rule
            })
            .collect();

        Ok(Self {
            rules,
            citation: CitationFormat::new(config.excerpt_chars),
        })
    }

    pub fn rules(&self) -> &[DecisionRule] {
        &self.rules
    }

    /// First rule in table order whose triggers appear in the text
    pub fn matching_rule(&self, text: &str) -> Option<&DecisionRule> {
        let lowered = text.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&lowered))
    }

    /// Scan chunks in the order given. Never fails.
    pub fn evaluate<'a>(
        &'a self,
        parsed: &ParsedQuery,
        chunks: &'a [RetrievedChunk],
    ) -> Evaluation<'a> {
        let mut evaluation = Evaluation {
            verdict: Verdict::Undetermined,
            deciding: None,
            clauses: Vec::new(),
        };

        let procedure = match parsed.procedure.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_lowercase(),
            _ => return evaluation,
        };

        for chunk in chunks {
            let lowered = chunk.text().to_lowercase();
            if !lowered.contains(&procedure) {
                continue;
            }

            evaluation.clauses.push(chunk);
            if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&lowered)) {
                evaluation.verdict = rule.verdict;
                evaluation.deciding = Some((rule, chunk));
                break;
            }
        }

        evaluation
    }

    /// Produce exactly one decision
    pub fn reason(&self, parsed: &ParsedQuery, chunks: &[RetrievedChunk]) -> Decision {
        let evaluation = self.evaluate(parsed, chunks);

        let justification = match evaluation.deciding {
            Some((rule, chunk)) => self.citation.cite(&rule.justification, chunk.text()),
            None => UNDETERMINED_JUSTIFICATION.to_string(),
        };

        Decision {
            verdict: evaluation.verdict,
            amount: AMOUNT_NOT_COMPUTED.to_string(),
            justification,
            applicable_clauses: evaluation
                .clauses
                .iter()
                .map(|chunk| chunk.text().to_string())
                .collect(),
        }
    }
}
