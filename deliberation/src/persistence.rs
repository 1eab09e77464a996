//! Message persistence and finished-session snapshots.
//!
//! Persistence is best-effort from the engine's point of view: the
//! orchestrator logs a failed write and carries on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::debate::state::DebateSession;
use crate::voting::Vote;

/// Role a stored message is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredRole {
    User,
    Assistant,
    System,
    VoteResults,
}

impl std::fmt::Display for StoredRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
            Self::VoteResults => write!(f, "vote_results"),
        }
    }
}

/// Error during persistence operations.
#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    SerializeFailed { reason: String },
    DeserializeFailed { reason: String },
    VersionMismatch { expected: u32, found: u32 },
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::SerializeFailed { reason } => write!(f, "serialize failed: {}", reason),
            Self::DeserializeFailed { reason } => write!(f, "deserialize failed: {}", reason),
            Self::VersionMismatch { expected, found } => {
                write!(f, "version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[async_trait]
pub trait Persister: Send + Sync {
    async fn persist(
        &self,
        role: StoredRole,
        content: &str,
        agent_name: Option<&str>,
    ) -> Result<(), PersistenceError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPersister;

#[async_trait]
impl Persister for NullPersister {
    async fn persist(
        &self,
        _role: StoredRole,
        _content: &str,
        _agent_name: Option<&str>,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// One line of a JSONL transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: StoredRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Appends each message as a JSON line.
#[derive(Debug)]
pub struct JsonlPersister {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlPersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored message back, oldest first.
    pub async fn read_all(path: &Path) -> Result<Vec<StoredMessage>, PersistenceError> {
        let raw = tokio::fs::read_to_string(path).await?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| PersistenceError::DeserializeFailed {
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl Persister for JsonlPersister {
    async fn persist(
        &self,
        role: StoredRole,
        content: &str,
        agent_name: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let message = StoredMessage {
            role,
            content: content.to_string(),
            agent_name: agent_name.map(str::to_string),
            recorded_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&message).map_err(|e| {
            PersistenceError::SerializeFailed {
                reason: e.to_string(),
            }
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Snapshot of a finished debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRecord {
    /// Schema version for forward compatibility.
    pub version: u32,
    pub session: DebateSession,
    pub options: Vec<String>,
    pub votes: Vec<Vote>,
    pub winner: Option<String>,
    pub stop_reason: String,
    pub report: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl DebateRecord {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::SerializeFailed {
            reason: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let record: Self =
            serde_json::from_str(json).map_err(|e| PersistenceError::DeserializeFailed {
                reason: e.to_string(),
            })?;

        if record.version > Self::CURRENT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                found: record.version,
            });
        }

        Ok(record)
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), PersistenceError> {
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}
