//! Conversational sessions against a remote agent

mod client;
mod identity;
mod stream;
mod types;

pub use client::SessionClient;
pub use identity::{AuthUser, IdentityProvider, StaticTokenIdentity};
pub use stream::{fragment_from_frame, AnswerStream, FrameDecoder};
pub use types::AgentSession;
