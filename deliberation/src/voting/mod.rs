//! Voting & consensus.
//!
//! After the debate, the moderator distills the discussion into two to four
//! options, every debater casts a ballot, each free-text decision is fuzzily
//! matched onto an option, and the ballots are tallied.
//!
//! # Modules
//!
//! - [`options`]: option extraction and validation
//! - [`ballot`]: ballot prompts, parsing and the abstain fallback
//! - [`normalize`]: Ratcliff/Obershelp matching of decisions onto options
//! - [`tally`]: counting and the tie-break rule

pub mod ballot;
pub mod normalize;
pub mod options;
pub mod tally;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use ballot::{Ballot, Vote, ABSTAIN, ABSTAIN_REASON};
pub use normalize::{normalize_decision, similarity_ratio, NormalizedDecision};
pub use options::{VotingOptions, FALLBACK_OPTIONS};
pub use tally::{TallyOutcome, VoteTally};

use crate::agent::Agent;
use crate::config::VotingConfig;
use crate::debate::state::DebateSession;

/// Structured-output failures. All of them are recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotingError {
    #[error("expected 2 to 4 distinct options, got {0}")]
    OptionCount(usize),

    #[error("malformed option list: {0}")]
    MalformedOptions(String),

    #[error("malformed ballot: {0}")]
    MalformedBallot(String),
}

pub struct VotingEngine {
    config: VotingConfig,
}

impl VotingEngine {
    pub fn new(config: VotingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// Ask the moderator for options grounded in the last debater turns.
    ///
    /// Any failure yields [`VotingOptions::fallback`].
    pub async fn extract_options(&self, moderator: &Agent, session: &DebateSession) -> VotingOptions {
        let summary = session
            .recent_debater_texts(self.config.option_window)
            .join("\n");
        let prompt =
            VotingOptions::extraction_prompt(&session.topic, &summary, self.config.option_input_chars);

        match moderator.prompt(&prompt).await {
            Ok(answer) => match VotingOptions::parse(&answer) {
                Ok(options) => {
                    info!(count = options.len(), options = %options.joined(), "voting options extracted");
                    options
                }
                Err(e) => {
                    warn!(error = %e, "option extraction unusable, using fallback");
                    VotingOptions::fallback()
                }
            },
            Err(e) => {
                warn!(error = %e, "option extraction failed, using fallback");
                VotingOptions::fallback()
            }
        }
    }

    /// Collect one debater's ballot, retrying unusable answers.
    pub async fn collect_vote(
        &self,
        voter: &Agent,
        company_block: &str,
        session: &DebateSession,
        options: &VotingOptions,
    ) -> Vote {
        let prompt = ballot::ballot_prompt(
            company_block,
            &session.topic,
            session.recent_entries(self.config.vote_transcript_window),
            options,
            voter,
        );

        for attempt in 1..=self.config.vote_attempts {
            let answer = match voter.prompt(&prompt).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(agent = voter.name(), attempt, error = %e, "ballot generation failed");
                    continue;
                }
            };
            match Ballot::parse(&answer) {
                Ok(ballot) => return self.finalize(voter, ballot, options),
                Err(e) => {
                    warn!(agent = voter.name(), attempt, error = %e, "ballot unusable");
                }
            }
        }

        warn!(
            agent = voter.name(),
            attempts = self.config.vote_attempts,
            "voting failed, recording abstention"
        );
        Vote::abstain(voter)
    }

    /// Ballots from every debater, in roster order.
    pub async fn collect_votes(
        &self,
        voters: &[Agent],
        company_block: &str,
        session: &DebateSession,
        options: &VotingOptions,
    ) -> Vec<Vote> {
        let mut votes = Vec::with_capacity(voters.len());
        for voter in voters {
            votes.push(self.collect_vote(voter, company_block, session, options).await);
        }
        votes
    }

    fn finalize(&self, voter: &Agent, ballot: Ballot, options: &VotingOptions) -> Vote {
        let decision = if ballot.decision.trim().eq_ignore_ascii_case(ABSTAIN) {
            ABSTAIN.to_string()
        } else {
            let normalized = normalize_decision(
                &ballot.decision,
                options,
                self.config.similarity_threshold,
                self.config.substring_bonus,
            );
            debug!(
                agent = voter.name(),
                raw = %ballot.decision,
                label = %normalized.label,
                score = normalized.score,
                matched = normalized.matched,
                "ballot normalized"
            );
            normalized.label
        };

        Vote {
            agent: voter.name().to_string(),
            persona: voter.persona_label().to_string(),
            decision,
            reason: ballot.reason,
        }
    }
}
