//! Board debate loop.
//!
//! State machine, turn scheduling and the orchestrator that runs a whole
//! board session from enrichment to the final report.
//!
//! # Debate Flow
//!
//! ```text
//! Enriching → Debating ──────────────→ Voting → Reporting → Ended
//!                │  ▲
//!   every 3rd    │  │
//!   good turn    ▼  │
//!         ModeratorInterjection
//!
//!   fatal internal error at any point → Ended
//! ```

pub mod contradiction;
pub mod guardrails;
pub mod orchestrator;
pub mod scheduler;
pub mod state;
pub mod turn;

pub use contradiction::{ContradictionDetector, ContradictionVerdict};
pub use guardrails::{Guardrails, StopReason};
pub use orchestrator::{Collaborators, DebateOrchestrator, DebateOutcome, DebateRequest};
pub use scheduler::{Routing, TurnScheduler};
pub use state::{
    DebatePhase, DebateSession, DebateTransition, TranscriptEntry, TranscriptRole,
    TransitionError,
};
pub use turn::Turn;
