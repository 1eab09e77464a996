//! Debate configuration.
//!
//! Every tunable the engine reads lives here. All sections implement
//! `Default` with the values the board has always run with, and the whole
//! tree deserializes from TOML with missing keys falling back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading/validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Turn scheduling limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum turns a single debater may take.
    pub max_speaks_per_agent: u32,
    /// Absolute bound on scheduling iterations (errored turns included).
    pub max_turns: u32,
    /// Iterations after which the debate may close once everyone has spoken.
    pub min_turns_before_early_exit: u32,
    /// Moderator interjects after every N successful debater turns.
    pub interjection_every: u32,
    /// Transcript entries shown to the moderator when interjecting.
    pub interjection_window: usize,
    /// Fixed RNG seed for reproducible routing.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_speaks_per_agent: 2,
            max_turns: 10,
            min_turns_before_early_exit: 5,
            interjection_every: 3,
            interjection_window: 6,
            seed: None,
        }
    }
}

/// Argument compaction budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactorConfig {
    /// Characters of the turn sent to the summarizer.
    pub summary_input_chars: usize,
    /// Characters kept from the summarizer's answer.
    pub summary_max_chars: usize,
    /// Characters of raw text kept when summarization fails.
    pub fallback_chars: usize,
    /// Summaries replayed into each prompt.
    pub max_replayed: usize,
}

impl Default for CompactorConfig {
    fn default() -> Self {
        Self {
            summary_input_chars: 200,
            summary_max_chars: 100,
            fallback_chars: 80,
            max_replayed: 12,
        }
    }
}

/// Option extraction, ballot collection and normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Debater turns summarized for option extraction.
    pub option_window: usize,
    /// Character budget of that summary.
    pub option_input_chars: usize,
    /// Transcript entries shown to each voter.
    pub vote_transcript_window: usize,
    /// Attempts per voter before abstaining.
    pub vote_attempts: u32,
    /// Score a match must exceed to be accepted.
    pub similarity_threshold: f64,
    /// Added when the raw decision is contained in the option label.
    pub substring_bonus: f64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            option_window: 10,
            option_input_chars: 2000,
            vote_transcript_window: 5,
            vote_attempts: 2,
            similarity_threshold: 0.4,
            substring_bonus: 0.2,
        }
    }
}

/// Artificial delays for user-facing pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub turn_delay_ms: u64,
    pub moderator_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: 1500,
            moderator_delay_ms: 1000,
        }
    }
}

impl PacingConfig {
    /// No delays at all.
    pub fn instant() -> Self {
        Self {
            turn_delay_ms: 0,
            moderator_delay_ms: 0,
        }
    }
}

/// Which enrichment steps run before the debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub website: bool,
    pub web_search: bool,
    pub image: bool,
    pub memory_recall: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            website: true,
            web_search: true,
            image: true,
            memory_recall: true,
        }
    }
}

/// Top-level debate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    pub scheduler: SchedulerConfig,
    pub compactor: CompactorConfig,
    pub voting: VotingConfig,
    pub pacing: PacingConfig,
    pub enrichment: EnrichmentConfig,
    /// Prior statements compared against a new one.
    pub contradiction_window: usize,
    /// Explicit answer language; `None` means "the topic's language".
    pub language: Option<String>,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            compactor: CompactorConfig::default(),
            voting: VotingConfig::default(),
            pacing: PacingConfig::default(),
            enrichment: EnrichmentConfig::default(),
            contradiction_window: 3,
            language: None,
            event_buffer: 64,
        }
    }
}

impl DebateConfig {
    /// Parse from TOML text and validate.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            }
        }

        if self.scheduler.max_speaks_per_agent == 0 {
            return Err(invalid("scheduler.max_speaks_per_agent", "must be at least 1"));
        }
        if self.scheduler.max_turns == 0 {
            return Err(invalid("scheduler.max_turns", "must be at least 1"));
        }
        if self.scheduler.interjection_every == 0 {
            return Err(invalid("scheduler.interjection_every", "must be at least 1"));
        }
        if self.voting.vote_attempts == 0 {
            return Err(invalid("voting.vote_attempts", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.voting.similarity_threshold) {
            return Err(invalid("voting.similarity_threshold", "must be within 0.0..=1.0"));
        }
        if self.voting.substring_bonus < 0.0 {
            return Err(invalid("voting.substring_bonus", "must not be negative"));
        }
        if self.event_buffer == 0 {
            return Err(invalid("event_buffer", "must be at least 1"));
        }
        Ok(())
    }
}
