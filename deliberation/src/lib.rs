//! Board Debate Orchestration
//!
//! This library runs a persona-driven "board debate": a roster of debater
//! agents argues a business question in turns, a moderator keeps the
//! discussion on track, and the board closes with a vote and a decision
//! report.
//!
//! # Modules
//!
//! - [`agent`]: participants, the `Generate` capability and roster validation
//! - [`debate`]: phase state machine, turn scheduler, guardrails, contradiction
//!   checks and the orchestrator that sequences a whole session
//! - [`context`]: per-turn prompt assembly
//! - [`memory`]: argument compaction and the past-decision store
//! - [`voting`]: option extraction, ballots, fuzzy normalization and tallying
//! - [`report`]: the final decision document
//! - [`events`]: the event stream consumed by transports
//!
//! # Usage
//!
//! ```ignore
//! use deliberation::{Collaborators, DebateConfig, DebateOrchestrator, DebateRequest};
//! use tokio_stream::StreamExt;
//!
//! let orchestrator = DebateOrchestrator::new(roster, Collaborators::default(), DebateConfig::default());
//! let mut events = orchestrator.stream(DebateRequest::new("Should we open a second warehouse?"));
//! while let Some(event) = events.next().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod agent;
pub mod config;
pub mod context;
pub mod debate;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod memory;
pub mod persistence;
pub mod report;
pub mod text;
pub mod voting;

pub use agent::{
    Agent, AgentKind, ChatMessage, ChatRole, Generate, GenerateError, Roster, RosterEntry,
    RosterError, ERROR_MARKER,
};
pub use config::{
    CompactorConfig, ConfigError, DebateConfig, EnrichmentConfig, PacingConfig, SchedulerConfig,
    VotingConfig,
};
pub use context::{CompanyProfile, ContextAssembler, Enrichment, TurnContext};
pub use debate::{
    Collaborators, ContradictionDetector, ContradictionVerdict, DebateOrchestrator,
    DebateOutcome, DebatePhase, DebateRequest, DebateSession, Guardrails, Routing, StopReason,
    TranscriptEntry, TranscriptRole, TransitionError, Turn, TurnScheduler,
};
pub use enrichment::{Enricher, NoopEnricher};
pub use error::DebateError;
pub use events::{DebateEvent, EventSink, SYSTEM_ROLE};
pub use memory::{
    memory_block, ArgumentCompactor, InMemoryStore, MemoryRecord, MemoryStore, MemoryStoreError,
};
pub use persistence::{
    DebateRecord, JsonlPersister, NullPersister, PersistenceError, Persister, StoredMessage,
    StoredRole,
};
pub use report::ReportSynthesizer;
pub use voting::{
    normalize_decision, similarity_ratio, Ballot, NormalizedDecision, TallyOutcome, Vote,
    VoteTally, VotingEngine, VotingError, VotingOptions, ABSTAIN,
};
