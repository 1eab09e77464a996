//! Per-debater ballots.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::options::VotingOptions;
use super::VotingError;
use crate::agent::Agent;
use crate::debate::state::TranscriptEntry;
use crate::text::{json_span, strip_code_fences};

/// Decision recorded when a debater never returns a usable ballot.
pub const ABSTAIN: &str = "ABSTAIN";

/// Reason recorded alongside [`ABSTAIN`].
pub const ABSTAIN_REASON: &str = "Voting failed.";

/// One debater's final vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub agent: String,
    /// Short persona label.
    pub persona: String,
    pub decision: String,
    pub reason: String,
}

impl Vote {
    pub fn abstain(agent: &Agent) -> Self {
        Self {
            agent: agent.name().to_string(),
            persona: agent.persona_label().to_string(),
            decision: ABSTAIN.to_string(),
            reason: ABSTAIN_REASON.to_string(),
        }
    }

    pub fn is_abstain(&self) -> bool {
        self.decision == ABSTAIN
    }
}

/// A parsed, not yet normalized ballot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ballot {
    pub decision: String,
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    "...".to_string()
}

impl Ballot {
    /// Parse `{"decision": ..., "reason": ...}`, tolerating code fences and prose.
    pub fn parse(raw: &str) -> Result<Self, VotingError> {
        let cleaned = strip_code_fences(raw);
        let span = json_span(&cleaned, '{', '}')
            .ok_or_else(|| VotingError::MalformedBallot("no JSON object found".to_string()))?;
        let ballot: Self = serde_json::from_str(span)
            .map_err(|e| VotingError::MalformedBallot(e.to_string()))?;
        if ballot.decision.trim().is_empty() {
            return Err(VotingError::MalformedBallot("empty decision".to_string()));
        }
        Ok(ballot)
    }
}

/// Prompt asking one debater for a ballot.
pub fn ballot_prompt(
    company_block: &str,
    topic: &str,
    recent: &[TranscriptEntry],
    options: &VotingOptions,
    voter: &Agent,
) -> String {
    let mut history = String::new();
    for entry in recent {
        let _ = writeln!(history, "- {}", entry.render());
    }

    format!(
        "{company_block}\n\
         TOPIC: {topic}\n\
         DEBATE HISTORY:\n{history}\n\
         AVAILABLE OPTIONS: {options}\n\n\
         YOU ARE: {name} ({persona})\n\n\
         YOUR TASK:\n\
         Vote on this topic. Choose ONLY one of the options above.\n\
         Copy the option EXACTLY, letter for letter.\n\n\
         Output ONLY JSON:\n\
         {{\"decision\": \"EXACT_OPTION\", \"reason\": \"One short sentence\"}}",
        options = options.joined(),
        name = voter.name(),
        persona = voter.persona(),
    )
}
