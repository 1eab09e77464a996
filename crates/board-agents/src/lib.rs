//! Board Agents
//!
//! Host for the `deliberation` engine: resolves a declarative roster onto
//! rig-backed model providers, wires HTTP enrichment and file persistence,
//! and exposes the `board` command-line runner.

pub mod cli;
pub mod config;
pub mod enrich;
pub mod providers;

pub use config::{default_roster, BoardConfig, ProviderConfig, VisionConfig};
pub use enrich::HttpEnricher;
pub use providers::{ProviderRegistry, RigBackend};
