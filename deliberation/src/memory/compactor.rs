//! Argument compaction.
//!
//! After each successful debater turn the moderator condenses the turn into
//! a single sentence. The summaries stand in for the full transcript in later
//! prompts, which keeps prompt size flat as the debate grows.

use tracing::{debug, warn};

use crate::agent::Agent;
use crate::config::CompactorConfig;
use crate::text::truncate_chars;

#[derive(Debug, Clone, Default)]
pub struct ArgumentCompactor {
    config: CompactorConfig,
    summaries: Vec<String>,
}

impl ArgumentCompactor {
    pub fn new(config: CompactorConfig) -> Self {
        Self {
            config,
            summaries: Vec::new(),
        }
    }

    pub fn summary_prompt(&self, cleaned: &str) -> String {
        format!(
            "Summarize this argument in ONE sentence (main idea only): {}",
            truncate_chars(cleaned, self.config.summary_input_chars)
        )
    }

    /// Summarize a turn with `summarizer` and store the result.
    ///
    /// Never fails: a failed summary stores a truncated excerpt instead.
    pub async fn compact(&mut self, summarizer: &Agent, speaker: &str, cleaned: &str) -> &str {
        match summarizer.prompt(&self.summary_prompt(cleaned)).await {
            Ok(summary) => self.record_summary(speaker, &summary),
            Err(e) => {
                warn!(speaker, error = %e, "argument summary failed, storing excerpt");
                self.record_fallback(speaker, cleaned)
            }
        }
    }

    pub fn record_summary(&mut self, speaker: &str, summary: &str) -> &str {
        let entry = format!(
            "{}: {}",
            speaker,
            truncate_chars(summary.trim(), self.config.summary_max_chars)
        );
        debug!(speaker, chars = entry.chars().count(), "argument compacted");
        self.push(entry)
    }

    pub fn record_fallback(&mut self, speaker: &str, cleaned: &str) -> &str {
        let entry = format!(
            "{}: {}...",
            speaker,
            truncate_chars(cleaned, self.config.fallback_chars)
        );
        self.push(entry)
    }

    fn push(&mut self, entry: String) -> &str {
        self.summaries.push(entry);
        self.summaries.last().map(String::as_str).unwrap_or_default()
    }

    /// The most recent summaries, oldest first, bounded by `max_replayed`.
    pub fn replayable(&self) -> &[String] {
        let start = self.summaries.len().saturating_sub(self.config.max_replayed);
        &self.summaries[start..]
    }

    pub fn all(&self) -> &[String] {
        &self.summaries
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}
