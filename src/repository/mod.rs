//! Persisted agent list
//!
//! Agents are stored under a single key of a [`KeyValueStore`]. A JSON file
//! store is provided for the CLI host and an in-memory one for tests.

mod agents;
mod store;

pub use agents::{AgentRepository, AGENTS_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
