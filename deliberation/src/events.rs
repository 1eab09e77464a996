//! Debate event stream.
//!
//! Events are emitted in order and never revised. Transports serialize them
//! as-is; the JSON shape is `{"type": "...", ...}`.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::DebateError;
use crate::voting::Vote;

/// Display name used for engine-authored messages.
pub const SYSTEM_ROLE: &str = "System";

/// One incremental update of a running debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// An agent (or the system) is about to produce a message.
    Typing { agent: String },
    /// A transcript-visible message.
    Message {
        role: String,
        content: String,
        is_agent: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<u8>,
    },
    /// Every ballot, emitted once per session.
    VoteResults { votes: Vec<Vote> },
    /// Unexpected internal failure; always followed by `End`.
    Error { message: String },
    /// Final event of every session.
    End { reason: String },
}

impl DebateEvent {
    pub fn typing(agent: impl Into<String>) -> Self {
        Self::Typing {
            agent: agent.into(),
        }
    }

    pub fn system_typing() -> Self {
        Self::typing(SYSTEM_ROLE)
    }

    /// Message authored by the engine itself.
    pub fn system(content: impl Into<String>) -> Self {
        Self::Message {
            role: SYSTEM_ROLE.to_string(),
            content: content.into(),
            is_agent: false,
            confidence: None,
        }
    }

    /// Message authored by a debater or the moderator.
    pub fn agent(name: impl Into<String>, content: impl Into<String>, confidence: Option<u8>) -> Self {
        Self::Message {
            role: name.into(),
            content: content.into(),
            is_agent: true,
            confidence,
        }
    }

    pub fn end(reason: impl Into<String>) -> Self {
        Self::End {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Snake-case event kind, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Typing { .. } => "typing",
            Self::Message { .. } => "message",
            Self::VoteResults { .. } => "vote_results",
            Self::Error { .. } => "error",
            Self::End { .. } => "end",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. })
    }
}

/// Sending half of the event channel.
///
/// A failed send means the consumer dropped the stream, which is the one
/// cancellation signal the engine honors.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<DebateEvent>,
}

impl EventSink {
    /// Bounded channel; the stream side yields events in emit order.
    pub fn channel(buffer: usize) -> (Self, ReceiverStream<DebateEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, ReceiverStream::new(rx))
    }

    pub async fn emit(&self, event: DebateEvent) -> Result<(), DebateError> {
        debug!(kind = event.kind(), "emitting event");
        self.tx
            .send(event)
            .await
            .map_err(|_| DebateError::ConsumerGone)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
