//! Pattern-based query parsing.
//!
//! Each field has its own rule. Rules never see each other's output and never
//! fail: a rule that does not match leaves its field absent.

use regex::Regex;
use std::fmt;

use crate::errors::{PolicyError, Result};
use crate::types::{Gender, ParsedQuery};

/// Field a rule fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Age,
    Gender,
    Procedure,
    Location,
    PolicyDuration,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Age => "age",
            Field::Gender => "gender",
            Field::Procedure => "procedure",
            Field::Location => "location",
            Field::PolicyDuration => "policy_duration",
        };
        f.write_str(name)
    }
}

/// Value produced by a matching rule, tagged by field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Age(u32),
    Gender(Gender),
    Procedure(String),
    Location(String),
    PolicyDuration(String),
}

impl Extracted {
    pub fn field(&self) -> Field {
        match self {
            Extracted::Age(_) => Field::Age,
            Extracted::Gender(_) => Field::Gender,
            Extracted::Procedure(_) => Field::Procedure,
            Extracted::Location(_) => Field::Location,
            Extracted::PolicyDuration(_) => Field::PolicyDuration,
        }
    }

    fn apply(self, parsed: &mut ParsedQuery) {
        match self {
            Extracted::Age(age) => parsed.age = Some(age),
            Extracted::Gender(gender) => parsed.gender = Some(gender),
            Extracted::Procedure(procedure) => parsed.procedure = Some(procedure),
            Extracted::Location(location) => parsed.location = Some(location),
            Extracted::PolicyDuration(duration) => parsed.policy_duration = Some(duration),
        }
    }
}

/// One independent extraction rule
pub trait ExtractionRule: Send + Sync {
    fn field(&self) -> Field;

    /// Extract from the original query text; `None` when absent
    fn extract(&self, query: &str) -> Option<Extracted>;
}

fn compile(field: Field, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        PolicyError::ConfigurationError(format!("Invalid {} pattern: {}", field, e))
    })
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// "46-year-old", "46 year old", "46 years old"
pub struct AgeRule {
    pattern: Regex,
}

impl AgeRule {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: compile(Field::Age, r"\b(\d{1,3})[- ]?years?[- ]?old\b")?,
        })
    }
}

impl ExtractionRule for AgeRule {
    fn field(&self) -> Field {
        Field::Age
    }

    fn extract(&self, query: &str) -> Option<Extracted> {
        let lowered = query.to_lowercase();
        let captures = self.pattern.captures(&lowered)?;
        captures[1].parse().ok().map(Extracted::Age)
    }
}

/// Whole-word "male" / "female"; "female" never reads as "male"
pub struct GenderRule {
    male: Regex,
    female: Regex,
}

impl GenderRule {
    pub fn new() -> Result<Self> {
        Ok(Self {
            male: compile(Field::Gender, r"\bmale\b")?,
            female: compile(Field::Gender, r"\bfemale\b")?,
        })
    }
}

impl ExtractionRule for GenderRule {
    fn field(&self) -> Field {
        Field::Gender
    }

    fn extract(&self, query: &str) -> Option<Extracted> {
        let lowered = query.to_lowercase();
        if self.male.is_match(&lowered) {
            Some(Extracted::Gender(Gender::Male))
        } else if self.female.is_match(&lowered) {
            Some(Extracted::Gender(Gender::Female))
        } else {
            None
        }
    }
}

/// Letters and spaces after the word "in", up to the next delimiter
pub struct LocationRule {
    pattern: Regex,
}

impl LocationRule {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: compile(Field::Location, r"\bin ([A-Za-z\s]+)")?,
        })
    }
}

impl ExtractionRule for LocationRule {
    fn field(&self) -> Field {
        Field::Location
    }

    fn extract(&self, query: &str) -> Option<Extracted> {
        let captures = self.pattern.captures(query)?;
        non_empty(&captures[1]).map(Extracted::Location)
    }
}

/// Text between a comma and the word "in": ", knee surgery in Pune"
pub struct ProcedureRule {
    pattern: Regex,
}

impl ProcedureRule {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: compile(Field::Procedure, r", (.+?) in\b")?,
        })
    }
}

impl ExtractionRule for ProcedureRule {
    fn field(&self) -> Field {
        Field::Procedure
    }

    fn extract(&self, query: &str) -> Option<Extracted> {
        let captures = self.pattern.captures(query)?;
        non_empty(&captures[1]).map(Extracted::Procedure)
    }
}

/// First "<n> month(s)" or "<n> year(s)", skipping the leading "<n> year old"
/// that the age rule claims. Later "<n>-year-old" phrases are durations.
pub struct PolicyDurationRule {
    pattern: Regex,
}

impl PolicyDurationRule {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: compile(
                Field::PolicyDuration,
                r"(?P<span>\d+[- ]?(?P<unit>month|year)s?)(?P<old>[- ]?old\b)?",
            )?,
        })
    }
}

impl ExtractionRule for PolicyDurationRule {
    fn field(&self) -> Field {
        Field::PolicyDuration
    }

    fn extract(&self, query: &str) -> Option<Extracted> {
        let lowered = query.to_lowercase();
        let mut age_skipped = false;
        self.pattern
            .captures_iter(&lowered)
            .find(|c| {
                let is_age = c.name("old").is_some() && &c["unit"] == "year";
                if is_age && !age_skipped {
                    age_skipped = true;
                    return false;
                }
                true
            })
            .map(|c| Extracted::PolicyDuration(c["span"].replace('-', " ")))
    }
}

/// Runs every extraction rule over a query
pub struct QueryParser {
    rules: Vec<Box<dyn ExtractionRule>>,
}

impl QueryParser {
    /// Parser with the standard rule set
    pub fn new() -> Result<Self> {
        Ok(Self {
            rules: vec![
                Box::new(AgeRule::new()?),
                Box::new(GenderRule::new()?),
                Box::new(LocationRule::new()?),
                Box::new(ProcedureRule::new()?),
                Box::new(PolicyDurationRule::new()?),
            ],
        })
    }

    /// Parser with a custom rule set
    pub fn with_rules(rules: Vec<Box<dyn ExtractionRule>>) -> Self {
        Self { rules }
    }

    /// Fields covered by the configured rules
    pub fn fields(&self) -> Vec<Field> {
        self.rules.iter().map(|r| r.field()).collect()
    }

    /// Extract every field the rules can find. Never fails.
    pub fn parse(&self, query: &str) -> ParsedQuery {
        let mut parsed = ParsedQuery::empty(query);

        for rule in &self.rules {
            if let Some(value) = rule.extract(query) {
                debug_assert_eq!(value.field(), rule.field());
                value.apply(&mut parsed);
            }
        }

        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new().unwrap()
    }

    #[test]
    fn test_reference_query() {
        let parsed = parser().parse("46-year-old male, knee surgery in Pune, 3-month-old insurance policy");
        assert_eq!(parsed.age, Some(46));
        assert_eq!(parsed.gender, Some(Gender::Male));
        assert_eq!(parsed.procedure.as_deref(), Some("knee surgery"));
        assert_eq!(parsed.location.as_deref(), Some("Pune"));
        assert_eq!(parsed.policy_duration.as_deref(), Some("3 month"));
        assert_eq!(
            parsed.original_text,
            "46-year-old male, knee surgery in Pune, 3-month-old insurance policy"
        );
    }

    #[test]
    fn test_age_forms() {
        let parser = parser();
        assert_eq!(parser.parse("46-year-old").age, Some(46));
        assert_eq!(parser.parse("46 year old").age, Some(46));
        assert_eq!(parser.parse("a 46 years old patient").age, Some(46));
        assert_eq!(parser.parse("age forty six").age, None);
    }

    #[test]
    fn test_female_is_never_male() {
        let parser = parser();
        assert_eq!(parser.parse("female").gender, Some(Gender::Female));
        assert_eq!(parser.parse("32 year old FEMALE, c-section in Delhi").gender, Some(Gender::Female));
        assert_eq!(parser.parse("Male patient").gender, Some(Gender::Male));
        assert_eq!(parser.parse("no cue here").gender, None);
    }

    #[test]
    fn test_location_is_case_sensitive_on_original_text() {
        let parser = parser();
        assert_eq!(
            parser.parse("cataract surgery in New Delhi, 2 year policy").location.as_deref(),
            Some("New Delhi")
        );
        assert_eq!(parser.parse("no place mentioned").location, None);
    }

    #[test]
    fn test_procedure_requires_comma_and_in() {
        let parser = parser();
        assert_eq!(
            parser.parse("55F, hip replacement in Mumbai").procedure.as_deref(),
            Some("hip replacement")
        );
        assert_eq!(parser.parse("knee surgery in Pune").procedure, None);
    }

    #[test]
    fn test_in_must_be_a_whole_word() {
        let parser = parser();
        let parsed = parser.parse("male, eye surgery involving implant in Pune");
        assert_eq!(parsed.procedure.as_deref(), Some("eye surgery involving implant"));
        assert_eq!(parsed.location.as_deref(), Some("Pune"));

        let parsed = parser.parse("female, treated within network in Goa");
        assert_eq!(parsed.procedure.as_deref(), Some("treated within network"));
        assert_eq!(parsed.location.as_deref(), Some("Goa"));
    }

    #[test]
    fn test_policy_duration_forms() {
        let parser = parser();
        assert_eq!(
            parser.parse("policy active for 2 years").policy_duration.as_deref(),
            Some("2 years")
        );
        assert_eq!(
            parser.parse("12-months policy").policy_duration.as_deref(),
            Some("12 months")
        );
        assert_eq!(parser.parse("46-year-old male").policy_duration, None);
        assert_eq!(parser.parse("new policy").policy_duration, None);
    }

    #[test]
    fn test_policy_age_in_years_after_patient_age() {
        let parsed = parser().parse("30-year-old female, cataract surgery in Delhi, 2-year-old insurance policy");
        assert_eq!(parsed.age, Some(30));
        assert_eq!(parsed.policy_duration.as_deref(), Some("2 year"));
    }

    #[test]
    fn test_empty_query_has_no_fields() {
        let parsed = parser().parse("");
        assert_eq!(parsed.extracted_fields(), 0);
        assert_eq!(parsed.original_text, "");
    }

    #[test]
    fn test_rules_are_independent() {
        let only_age = QueryParser::with_rules(vec![Box::new(AgeRule::new().unwrap())]);
        let parsed = only_age.parse("46-year-old male, knee surgery in Pune");
        assert_eq!(parsed.age, Some(46));
        assert_eq!(parsed.gender, None);
        assert_eq!(parsed.procedure, None);
        assert_eq!(only_age.fields(), vec![Field::Age]);
    }
}
