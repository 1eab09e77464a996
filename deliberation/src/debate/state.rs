//! Debate state machine: phases, transitions, transcript and session tracking.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{CompanyProfile, Enrichment};

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Gathering image, website, search and memory context.
    Enriching,
    /// Debaters take turns.
    Debating,
    /// The moderator is steering the discussion.
    ModeratorInterjection,
    /// Options extracted and ballots collected.
    Voting,
    /// Final decision report being written.
    Reporting,
    /// Session finished, normally or not.
    Ended,
}

impl DebatePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Enriching => &[Self::Debating, Self::Ended],
            Self::Debating => &[Self::ModeratorInterjection, Self::Voting, Self::Ended],
            Self::ModeratorInterjection => &[Self::Debating, Self::Ended],
            Self::Voting => &[Self::Reporting, Self::Ended],
            Self::Reporting => &[Self::Ended],
            Self::Ended => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enriching => write!(f, "enriching"),
            Self::Debating => write!(f, "debating"),
            Self::ModeratorInterjection => write!(f, "moderator_interjection"),
            Self::Voting => write!(f, "voting"),
            Self::Reporting => write!(f, "reporting"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// Who a transcript entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    User,
    Debater,
    Moderator,
    System,
}

impl std::fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Debater => write!(f, "debater"),
            Self::Moderator => write!(f, "moderator"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One transcript line, always carrying an explicit speaker tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub content: String,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TranscriptRole::User,
            speaker: None,
            content: content.into(),
        }
    }

    pub fn debater(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: TranscriptRole::Debater,
            speaker: Some(speaker.into()),
            content: content.into(),
        }
    }

    pub fn moderator(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: TranscriptRole::Moderator,
            speaker: Some(speaker.into()),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TranscriptRole::System,
            speaker: None,
            content: content.into(),
        }
    }

    /// System note attributed to an agent, e.g. a skipped turn.
    pub fn system_about(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: TranscriptRole::System,
            speaker: Some(speaker.into()),
            content: content.into(),
        }
    }

    /// Name shown when this entry is quoted back to an agent.
    ///
    /// System notes always read as the system, even when they concern an
    /// agent; the agent they concern stays in `speaker`.
    pub fn speaker_label(&self) -> &str {
        match (self.role, &self.speaker) {
            (TranscriptRole::System, _) => crate::events::SYSTEM_ROLE,
            (_, Some(name)) => name,
            (_, None) => "User",
        }
    }

    /// `"{speaker}: {content}"`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.speaker_label(), self.content)
    }
}

/// A debate session tracking state and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub company: CompanyProfile,
    #[serde(default)]
    pub enrichment: Enrichment,
    pub phase: DebatePhase,
    pub transitions: Vec<DebateTransition>,
    pub transcript: Vec<TranscriptEntry>,
    /// Cleaned statements per debater, oldest first.
    pub statements: BTreeMap<String, Vec<String>>,
    pub speak_counts: BTreeMap<String, u32>,
    /// Compacted argument summaries, oldest first.
    pub summaries: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    pub fn new(topic: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            company: CompanyProfile::default(),
            enrichment: Enrichment::default(),
            phase: DebatePhase::Enriching,
            transitions: Vec::new(),
            transcript: Vec::new(),
            statements: BTreeMap::new(),
            speak_counts: BTreeMap::new(),
            summaries: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(DebateTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;
        Ok(())
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    /// Record a successful debater turn.
    pub fn record_turn(&mut self, speaker: &str, cleaned: &str) {
        self.transcript.push(TranscriptEntry::debater(speaker, cleaned));
        self.statements
            .entry(speaker.to_string())
            .or_default()
            .push(cleaned.to_string());
        *self.speak_counts.entry(speaker.to_string()).or_insert(0) += 1;
    }

    /// Record a skipped turn. Speak counts are untouched.
    pub fn record_pass(&mut self, speaker: &str) {
        self.transcript.push(TranscriptEntry::system_about(
            speaker,
            format!("{} passed this turn due to a technical issue.", speaker),
        ));
    }

    pub fn speak_count(&self, speaker: &str) -> u32 {
        self.speak_counts.get(speaker).copied().unwrap_or(0)
    }

    /// Up to `window` most recent statements by `speaker`, oldest first.
    pub fn prior_statements(&self, speaker: &str, window: usize) -> &[String] {
        match self.statements.get(speaker) {
            Some(all) => &all[all.len().saturating_sub(window)..],
            None => &[],
        }
    }

    /// Speaker label and content of the last statement, skipping system notes.
    ///
    /// Falls back to the user and the topic when nobody has spoken yet.
    pub fn previous_message(&self) -> (&str, &str) {
        match self
            .transcript
            .iter()
            .rev()
            .find(|e| e.role != TranscriptRole::System)
        {
            Some(entry) => (entry.speaker_label(), entry.content.as_str()),
            None => ("User", self.topic.as_str()),
        }
    }

    pub fn recent_entries(&self, n: usize) -> &[TranscriptEntry] {
        &self.transcript[self.transcript.len().saturating_sub(n)..]
    }

    /// Content of debater entries among the last `n` transcript entries.
    pub fn recent_debater_texts(&self, n: usize) -> Vec<&str> {
        self.recent_entries(n)
            .iter()
            .filter(|e| e.role == TranscriptRole::Debater)
            .map(|e| e.content.as_str())
            .collect()
    }

    /// Transcript entries a report may quote.
    pub fn public_transcript(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.transcript
            .iter()
            .filter(|e| e.role != TranscriptRole::System)
    }

    /// Debater turns taken in this session; seeded history is not counted.
    pub fn debater_turns(&self) -> usize {
        self.speak_counts.values().map(|&c| c as usize).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] {} debater turns | {} transcript entries | session={}",
            self.phase,
            self.debater_turns(),
            self.transcript.len(),
            self.id
        )
    }
}
