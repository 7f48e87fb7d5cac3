//! Wire types of the agent session protocol

use serde::{Deserialize, Serialize};

/// Server-assigned conversation handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSession {
    pub id: String,
}

/// `POST /sessions`
#[derive(Debug, Serialize)]
pub(crate) struct CreateSessionRequest<'a> {
    pub locales: &'a [String],
}

/// `POST /sessions/{id}/questions`
#[derive(Debug, Serialize)]
pub(crate) struct QuestionRequest<'a> {
    pub question: &'a str,
}

/// `POST /sessions/{id}/transcriptions`
#[derive(Debug, Serialize)]
pub(crate) struct TranscriptionRequest<'a> {
    pub file: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptionResponse {
    pub text: String,
}

/// Response of `POST /sessions/{id}/interactions`
#[derive(Debug, Deserialize)]
pub(crate) struct InteractionSummaryResponse {
    pub summary: String,
}
