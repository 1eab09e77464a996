//! Contradiction checks against a debater's own earlier statements.
//!
//! The check is advisory and fails open: any answer that is not a clear
//! `CONTRADICTION: <reason>` counts as no contradiction.

use tracing::{debug, warn};

use crate::agent::Agent;

const CONTRADICTION_PREFIX: &str = "CONTRADICTION:";
const NONE_TOKEN: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContradictionVerdict {
    /// A fundamental inconsistency, with the moderator's explanation.
    Contradiction(String),
    NoContradiction,
    /// The answer matched neither token.
    Unrecognized(String),
    /// The moderator could not be reached.
    Unavailable,
}

impl ContradictionVerdict {
    pub fn parse(answer: &str) -> Self {
        let trimmed = answer
            .trim()
            .trim_start_matches(|c: char| c == '*' || c == '"' || c == '`')
            .trim_start();

        let head: String = trimmed.chars().take(CONTRADICTION_PREFIX.len()).collect();
        if head.eq_ignore_ascii_case(CONTRADICTION_PREFIX) {
            let reason = trimmed[head.len()..]
                .trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '"' || c == '`');
            return Self::Contradiction(reason.to_string());
        }

        let bare = trimmed.trim_matches(|c: char| !c.is_alphanumeric());
        if bare.eq_ignore_ascii_case(NONE_TOKEN) {
            return Self::NoContradiction;
        }
        Self::Unrecognized(answer.to_string())
    }

    pub fn is_contradiction(&self) -> bool {
        matches!(self, Self::Contradiction(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Contradiction(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContradictionDetector {
    window: usize,
}

impl Default for ContradictionDetector {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ContradictionDetector {
    /// `window` is how many prior statements are compared.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn prompt(&self, speaker: &str, prior: &[String], statement: &str) -> String {
        let start = prior.len().saturating_sub(self.window);
        let previous = prior[start..].join(" | ");
        format!(
            "TASK: Compare the two texts below and check for a contradiction.\n\n\
             PREVIOUS STATEMENTS ({speaker}):\n{previous}\n\n\
             NEW STATEMENT:\n{statement}\n\n\
             QUESTION: Does the new statement FUNDAMENTALLY contradict the previous ones (A vs not A)?\n\n\
             NOTE:\n\
             - Changing position because of new evidence is NOT a contradiction.\n\
             - Holding that there is both risk and opportunity is NOT a contradiction.\n\
             - Report only obvious inconsistencies (e.g. \"we have no money\" then \"our budget is ample\").\n\n\
             ANSWER FORMAT (exactly one):\n\
             - If there is a fundamental contradiction: \"{CONTRADICTION_PREFIX} [short explanation]\"\n\
             - Otherwise: \"{NONE_TOKEN}\""
        )
    }

    /// Ask `moderator` whether `statement` contradicts `prior`.
    ///
    /// An agent with no prior statements is never checked.
    pub async fn check(
        &self,
        moderator: &Agent,
        speaker: &str,
        prior: &[String],
        statement: &str,
    ) -> ContradictionVerdict {
        if prior.is_empty() {
            return ContradictionVerdict::NoContradiction;
        }
        match moderator.prompt(&self.prompt(speaker, prior, statement)).await {
            Ok(answer) => {
                let verdict = ContradictionVerdict::parse(&answer);
                if let ContradictionVerdict::Unrecognized(_) = verdict {
                    debug!(speaker, "contradiction answer unrecognized, treating as none");
                }
                verdict
            }
            Err(e) => {
                warn!(speaker, error = %e, "contradiction check unavailable");
                ContradictionVerdict::Unavailable
            }
        }
    }

    /// Transcript note for a detected contradiction.
    pub fn note(speaker: &str, reason: &str) -> String {
        format!("🔍 Contradiction detected! {}: {}", speaker, reason)
    }
}
