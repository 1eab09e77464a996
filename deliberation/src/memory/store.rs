//! Past board decisions.
//!
//! The store is shared across sessions for the life of the process. Lookups
//! rank stored decisions by word overlap with the new topic.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Maximum records returned by a search.
pub const RECALL_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub topic: String,
    pub decision: String,
    pub reason: String,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        topic: impl Into<String>,
        decision: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            decision: decision.into(),
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }

    fn document(&self) -> String {
        format!("{} {} {}", self.topic, self.decision, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("memory store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory store encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("memory store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Up to [`RECALL_LIMIT`] records relevant to `query`, best first.
    async fn search(&self, query: &str) -> Result<Vec<MemoryRecord>, MemoryStoreError>;

    async fn save(&self, record: MemoryRecord) -> Result<(), MemoryStoreError>;
}

/// "PAST BOARD DECISIONS" prompt block. Empty when there is nothing to recall.
pub fn memory_block(records: &[MemoryRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut block = String::from("PAST BOARD DECISIONS (Similar Topics):\n");
    for record in records {
        let _ = writeln!(
            block,
            "- Topic: {} -> Decision: {} ({})",
            record.topic, record.decision, record.reason
        );
    }
    block
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.chars().count() > 2)
        .collect()
}

/// Jaccard similarity of the two texts' word sets.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// In-process store with optional JSON file backing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<MemoryRecord>>,
    backing: Option<PathBuf>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file-backed store, loading any records already on disk.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, MemoryStoreError> {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), records = records.len(), "memory store opened");
        Ok(Self {
            records: RwLock::new(records),
            backing: Some(path),
        })
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(&self, query: &str) -> Result<Vec<MemoryRecord>, MemoryStoreError> {
        let query_words = word_set(query);
        let records = self.records.read().await;

        let mut scored: Vec<(f64, &MemoryRecord)> = records
            .iter()
            .map(|r| (jaccard(&query_words, &word_set(&r.document())), r))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        // Stable sort keeps older records first among equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(RECALL_LIMIT)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn save(&self, record: MemoryRecord) -> Result<(), MemoryStoreError> {
        let mut records = self.records.write().await;
        records.push(record);
        if let Some(path) = &self.backing {
            let json = serde_json::to_string_pretty(&*records)?;
            tokio::fs::write(path, json).await?;
        }
        Ok(())
    }
}
