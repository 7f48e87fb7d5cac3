//! Agent composition
//!
//! An [`Agent`] ties a manifest to the base URL it was fetched from. Rules are
//! compiled and the activation rule selected once, at construction; after
//! that the agent is immutable and cheap to clone, so the host can evaluate
//! thousands of intercepted requests against it without rescanning or
//! recompiling anything.

mod url;

pub use url::{logo_url, normalize_base_url, MANIFEST_PATH};

use crate::error::Result;
use crate::manifest::{
    ActivationAction, AddHeaderRuleAction, AgentManifest, AgentRule, HttpRequestAction,
    RecordInteractionRuleAction, RuleAction, RuleActionKind,
};
use crate::rules::{select_activation, ActivationRule, HttpRequestEvent, RuleSet};
use crate::session::{AgentSession, AnswerStream, IdentityProvider, SessionClient};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Collaborators handed to an agent at construction
#[derive(Clone, Default)]
pub struct AgentOptions {
    /// Identity used to authenticate session calls; `None` sends them anonymously
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// HTTP client shared by all calls of the agent
    pub http: Client,
}

impl AgentOptions {
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_http(mut self, http: Client) -> Self {
        self.http = http;
        self
    }
}

/// Persisted form of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAgent {
    pub url: String,
    pub manifest: AgentManifest,
}

/// End-of-session call the host should send, resolved from `onSessionClose`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCloseRequest {
    pub url: String,
    /// Declared method, `POST` when the manifest omits it
    pub method: String,
    pub session_id: String,
}

/// A remote agent described by its manifest
#[derive(Clone)]
pub struct Agent {
    url: String,
    logo: String,
    manifest: Arc<AgentManifest>,
    rules: Arc<RuleSet>,
    activation: Option<ActivationRule>,
    client: SessionClient,
}

impl Agent {
    /// Build an agent, compiling its rules.
    ///
    /// Fails with `Error::InvalidRule` when any `urlRegex` does not compile.
    pub fn new(url: &str, manifest: AgentManifest, options: AgentOptions) -> Result<Self> {
        let url = normalize_base_url(url);
        let rules = RuleSet::compile(manifest.rules())?;
        let activation = select_activation(manifest.rules());
        if activation.is_none() {
            tracing::debug!("Agent {} declares no activation rule", manifest.id);
        }

        Ok(Self {
            logo: logo_url(&url),
            client: SessionClient::new(url.clone(), options.http, options.identity),
            url,
            manifest: Arc::new(manifest),
            rules: Arc::new(rules),
            activation,
        })
    }

    /// Fetch `{url}/manifest.json` and build the agent from it.
    ///
    /// `url` may point at the agent root or at the manifest itself.
    pub async fn from_url(url: &str, options: AgentOptions) -> Result<Self> {
        let base = normalize_base_url(url);
        let manifest_url = format!("{}{}", base, MANIFEST_PATH);
        tracing::debug!("GET {}", manifest_url);

        let document: serde_json::Value = options
            .http
            .get(&manifest_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let manifest = AgentManifest::from_value(document)?;

        tracing::info!("Loaded manifest for agent {} from {}", manifest.id, base);
        Self::new(&base, manifest, options)
    }

    /// Rebuild an agent from its persisted form
    pub fn from_stored(stored: StoredAgent, options: AgentOptions) -> Result<Self> {
        Self::new(&stored.url, stored.manifest, options)
    }

    /// Persisted form of this agent
    pub fn to_stored(&self) -> StoredAgent {
        StoredAgent {
            url: self.url.clone(),
            manifest: (*self.manifest).clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Base URL, without trailing slash or manifest path
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn logo(&self) -> &str {
        &self.logo
    }

    pub fn manifest(&self) -> &AgentManifest {
        &self.manifest
    }

    /// The cached rule that decides activation, if the manifest has one
    pub fn activation_rule(&self) -> Option<&AgentRule> {
        self.activation
            .as_ref()
            .and_then(|a| self.manifest.rules().get(a.index))
    }

    /// The activation directive of [`Agent::activation_rule`]
    pub fn activation_action(&self) -> Option<&ActivationAction> {
        self.activation.as_ref().map(|a| &a.action)
    }

    /// Whether this agent should attach to `request`.
    ///
    /// Always false for manifests without an activation rule.
    pub fn activates_on(&self, request: &HttpRequestEvent) -> bool {
        self.activation
            .as_ref()
            .and_then(|a| self.rules.get(a.index))
            .is_some_and(|rule| crate::rules::matches(request, rule))
    }

    /// Actions of every rule matching `request`, in declaration order
    pub fn find_matching_actions(&self, request: &HttpRequestEvent) -> Vec<&RuleAction> {
        self.rules.matching_actions(request)
    }

    /// Header injections that apply to `request`
    pub fn headers_to_add(&self, request: &HttpRequestEvent) -> Vec<&AddHeaderRuleAction> {
        self.find_matching_actions(request)
            .into_iter()
            .filter_map(|action| match action.kind() {
                RuleActionKind::AddHeader(header) => Some(header),
                _ => None,
            })
            .collect()
    }

    /// Interaction recordings that apply to `request`
    pub fn interactions_to_record(
        &self,
        request: &HttpRequestEvent,
    ) -> Vec<&RecordInteractionRuleAction> {
        self.find_matching_actions(request)
            .into_iter()
            .filter_map(|action| match action.kind() {
                RuleActionKind::RecordInteraction(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Open a conversation with the agent
    pub async fn create_session(&self, locales: &[String]) -> Result<AgentSession> {
        self.client.create_session(locales).await
    }

    /// Ask a question; the answer streams back fragment by fragment
    pub fn ask(&self, message: &str, session_id: &str) -> AnswerStream {
        self.client.ask(message, session_id)
    }

    /// Transcribe base64-encoded audio within a session
    pub async fn transcript_audio(&self, base64_audio: &str, session_id: &str) -> Result<String> {
        self.client.transcript_audio(base64_audio, session_id).await
    }

    /// Summarize a recorded interaction within a session
    pub async fn solve_interaction_summary(
        &self,
        detail: &serde_json::Value,
        session_id: &str,
    ) -> Result<String> {
        self.client
            .solve_interaction_summary(detail, session_id)
            .await
    }

    /// `{baseUrl}/sessions/{id}`
    pub fn session_url(&self, session_id: &str) -> String {
        self.client.session_url(session_id)
    }

    /// The call the host should make when `session_id` ends, if declared
    pub fn session_close_request(&self, session_id: &str) -> Option<SessionCloseRequest> {
        self.manifest.on_session_close.as_ref().map(|close| {
            let HttpRequestAction { url, method } = &close.http_request;
            SessionCloseRequest {
                url: url.clone(),
                method: method.clone().unwrap_or_else(|| "POST".to_string()),
                session_id: session_id.to_string(),
            }
        })
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.manifest.id)
            .field("url", &self.url)
            .field("rules", &self.rules.len())
            .field("activation", &self.activation.as_ref().map(|a| a.index))
            .finish()
    }
}
