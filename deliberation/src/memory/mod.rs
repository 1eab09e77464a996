//! Board memory.
//!
//! # Modules
//!
//! - [`compactor`]: one-sentence argument summaries replayed into prompts
//! - [`store`]: past board decisions, recalled by topic similarity

pub mod compactor;
pub mod store;

pub use compactor::ArgumentCompactor;
pub use store::{memory_block, InMemoryStore, MemoryRecord, MemoryStore, MemoryStoreError};
