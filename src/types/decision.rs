//! Coverage decision emitted by the reasoner

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount placeholder; payout computation is not performed
pub const AMOUNT_NOT_COMPUTED: &str = "N/A";

/// Coverage verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Approved,
    Rejected,
    Undetermined,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Approved => "Approved",
            Verdict::Rejected => "Rejected",
            Verdict::Undetermined => "Undetermined",
        };
        f.write_str(label)
    }
}

/// Structured coverage decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Decision {
    #[serde(rename = "Decision")]
    pub verdict: Verdict,
    pub amount: String,
    pub justification: String,
    pub applicable_clauses: Vec<String>,
}

impl Decision {
    pub fn is_decisive(&self) -> bool {
        self.verdict != Verdict::Undetermined
    }
}
