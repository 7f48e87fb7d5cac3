//! Agent Gate - manifest-driven agents for intercepted HTTP traffic
//!
//! Agent Gate hosts pluggable remote agents. Each agent publishes a
//! `manifest.json` declaring when it should activate on observed HTTP
//! requests, which headers to inject or interactions to record, and how to
//! hold a conversational session with it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  HttpRequestEvent  ┌───────────────────────────────┐
//! │     Host     │ ─────────────────▶ │            Agent              │
//! │ (extension / │                    │  ┌──────────┐  ┌───────────┐  │
//! │     CLI)     │ ◀───────────────── │  │ RuleSet  │  │ Activation│  │
//! └──────┬───────┘  actions / match   │  └──────────┘  └───────────┘  │
//!        │                            │  ┌─────────────────────────┐  │
//!        │ ask / transcribe           │  │     SessionClient       │──┼──▶ remote agent
//!        └──────────────────────────▶ │  └─────────────────────────┘  │
//!                                     └───────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`manifest`]: Manifest model and validation
//! - [`rules`]: Rule matching and activation selection
//! - [`session`]: Session client and streamed answers
//! - [`agent`]: Agent composition
//! - [`repository`]: Persisted agent list
//! - [`config`]: Configuration management

pub mod agent;
pub mod config;
pub mod error;
pub mod manifest;
pub mod repository;
pub mod rules;
pub mod session;

pub use agent::{Agent, AgentOptions, SessionCloseRequest, StoredAgent};
pub use config::AgentGateConfig;
pub use error::{Error, Result};
pub use manifest::AgentManifest;
pub use repository::{AgentRepository, FileStore, KeyValueStore, MemoryStore};
pub use rules::HttpRequestEvent;
pub use session::{AgentSession, AnswerStream, AuthUser, IdentityProvider};
