//! Engine error taxonomy.
//!
//! Provider failures, malformed structured output and collaborator outages
//! are ordinary data inside a debate and never surface here. This type only
//! carries what ends a session once it has started. Rosters are checked
//! when they are built ([`crate::agent::RosterError`]), before any session.

use thiserror::Error;

use crate::config::ConfigError;
use crate::debate::state::TransitionError;

#[derive(Debug, Error)]
pub enum DebateError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The event receiver was dropped; the only cancellation path.
    #[error("event consumer disconnected")]
    ConsumerGone,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DebateError {
    /// Whether the consumer should be told about this error.
    ///
    /// A disconnected consumer cannot be told anything.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::ConsumerGone)
    }
}
