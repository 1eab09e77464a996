//! Voting options extracted from the debate.

use serde::{Deserialize, Serialize};

use super::VotingError;
use crate::text::{json_span, strip_code_fences, truncate_chars};

/// Options used when extraction fails.
pub const FALLBACK_OPTIONS: [&str; 2] = ["ACCEPT", "REJECT"];

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;

/// Two to four distinct labels, in the order the moderator listed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VotingOptions(Vec<String>);

impl VotingOptions {
    /// Trim, drop empties and case-insensitive duplicates, then check the count.
    pub fn new<I, S>(labels: I) -> Result<Self, VotingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                continue;
            }
            if kept.iter().any(|k| k.to_lowercase() == label.to_lowercase()) {
                continue;
            }
            kept.push(label.to_string());
        }

        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&kept.len()) {
            return Err(VotingError::OptionCount(kept.len()));
        }
        Ok(Self(kept))
    }

    pub fn fallback() -> Self {
        Self(FALLBACK_OPTIONS.iter().map(|s| s.to_string()).collect())
    }

    /// Parse a moderator answer holding a JSON list of labels.
    pub fn parse(raw: &str) -> Result<Self, VotingError> {
        let cleaned = strip_code_fences(raw);
        let span = json_span(&cleaned, '[', ']')
            .ok_or_else(|| VotingError::MalformedOptions("no JSON list found".to_string()))?;
        let items: Vec<serde_json::Value> = serde_json::from_str(span)
            .map_err(|e| VotingError::MalformedOptions(e.to_string()))?;

        let labels = items.into_iter().filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        Self::new(labels.collect::<Vec<_>>())
    }

    pub fn parse_or_fallback(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|_| Self::fallback())
    }

    pub fn extraction_prompt(topic: &str, debate_summary: &str, input_chars: usize) -> String {
        format!(
            "TASK: Analyze the debate below and extract concrete options the board can VOTE on.\n\n\
             TOPIC: {}\n\n\
             DEBATE SUMMARY:\n{}\n\n\
             RULES:\n\
             1. Use the distinct positions or proposals that came up in the debate as options.\n\
             2. If concrete figures were given (e.g. \"700 USD\", \"2000 USD\"), include them in the options.\n\
             3. If the decision reduces to yes/no, write only 2 options.\n\
             4. For open questions, list the distinct strategies that emerged.\n\
             5. At least {} and at most {} options.\n\
             6. Output ONLY a JSON list: [\"Option 1\", \"Option 2\", ...]\n\n\
             IMPORTANT: options must come from the debate, not be invented.",
            topic,
            truncate_chars(debate_summary, input_chars),
            MIN_OPTIONS,
            MAX_OPTIONS
        )
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of an exact label.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn is_fallback(&self) -> bool {
        self.0.iter().map(String::as_str).eq(FALLBACK_OPTIONS)
    }

    /// `"A, B, C"`.
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_list() {
        let raw = "```json\n[\"Open in Q3\", \"Lease first\", \"Wait a year\"]\n```";
        let options = VotingOptions::parse(raw).unwrap();
        assert_eq!(options.labels(), &["Open in Q3", "Lease first", "Wait a year"]);
        assert!(!options.is_fallback());
    }

    #[test]
    fn test_parse_with_prose() {
        let options =
            VotingOptions::parse("Here are the options: [\"Budget 700 USD\", \"Budget 2000 USD\"]. Good luck")
                .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options.position("Budget 2000 USD"), Some(1));
    }

    #[test]
    fn test_duplicates_and_blanks_dropped() {
        let options = VotingOptions::new(["Yes", " yes ", "", "No"]).unwrap();
        assert_eq!(options.labels(), &["Yes", "No"]);
    }

    #[test]
    fn test_count_out_of_range() {
        assert!(matches!(
            VotingOptions::new(["Only"]),
            Err(VotingError::OptionCount(1))
        ));
        assert!(matches!(
            VotingOptions::new(["A", "B", "C", "D", "E"]),
            Err(VotingError::OptionCount(5))
        ));
    }

    #[test]
    fn test_malformed_falls_back() {
        for raw in [
            "I think we should accept.",
            "[\"unterminated",
            "[]",
            "[\"A\", \"a\"]",
            "{\"options\": 3}",
        ] {
            let options = VotingOptions::parse_or_fallback(raw);
            assert!(options.is_fallback(), "expected fallback for {raw:?}");
            assert_eq!(options.labels(), &["ACCEPT", "REJECT"]);
        }
    }

    #[test]
    fn test_numeric_labels_kept() {
        let options = VotingOptions::parse("[700, 2000]").unwrap();
        assert_eq!(options.labels(), &["700", "2000"]);
    }

    #[test]
    fn test_extraction_prompt_truncates() {
        let summary = "z".repeat(3000);
        let prompt = VotingOptions::extraction_prompt("t", &summary, 2000);
        assert!(prompt.contains(&"z".repeat(2000)));
        assert!(!prompt.contains(&"z".repeat(2001)));
        assert!(prompt.contains("at most 4"));
    }

    #[test]
    fn test_joined() {
        assert_eq!(VotingOptions::fallback().joined(), "ACCEPT, REJECT");
    }
}
