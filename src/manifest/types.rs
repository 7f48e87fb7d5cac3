//! Manifest data types
//!
//! Mirrors the JSON document an agent serves at `/manifest.json`. Keys are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Declared identity, capabilities and rule set of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentManifest {
    /// Identifier, unique among installed agents
    pub id: String,
    /// Display name
    pub name: String,
    /// Message shown when a session starts
    pub welcome_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Vec<Prompt>>,
    /// Request the host sends when a session ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_session_close: Option<EndAction>,
    /// Rules evaluated against every observed HTTP request, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_http_request: Option<Vec<AgentRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    pub contact_email: String,
}

impl AgentManifest {
    /// Declared rules, empty when the manifest has none
    pub fn rules(&self) -> &[AgentRule] {
        self.on_http_request.as_deref().unwrap_or_default()
    }

    /// Whether the agent declares the given capability tag
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .as_ref()
            .is_some_and(|caps| caps.iter().any(|c| c == capability))
    }
}

/// Predefined prompt offered to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

/// Identity provider settings consumed by identity collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub url: String,
    pub client_id: String,
    pub scope: String,
}

/// A condition plus the actions applied when it matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRule {
    pub condition: RuleCondition,
    pub actions: Vec<RuleAction>,
}

impl AgentRule {
    /// First activation directive among this rule's actions
    pub fn activation(&self) -> Option<&ActivationAction> {
        self.actions.iter().find_map(|a| a.activate.as_ref())
    }
}

/// Request filter of a rule
///
/// Absent method or resource type lists match anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_regex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<Vec<String>>,
}

/// One action entry of a rule
///
/// At most one directive is meaningful per entry. An entry with none of them
/// is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate: Option<ActivationAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_header: Option<AddHeaderRuleAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_interaction: Option<RecordInteractionRuleAction>,
}

/// Directive carried by a [`RuleAction`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleActionKind<'a> {
    Activate(&'a ActivationAction),
    AddHeader(&'a AddHeaderRuleAction),
    RecordInteraction(&'a RecordInteractionRuleAction),
    Noop,
}

impl RuleAction {
    /// Resolve the meaningful directive.
    ///
    /// When an entry sets more than one, `activate` wins over `addHeader`,
    /// which wins over `recordInteraction`.
    pub fn kind(&self) -> RuleActionKind<'_> {
        if let Some(activate) = &self.activate {
            RuleActionKind::Activate(activate)
        } else if let Some(header) = &self.add_header {
            RuleActionKind::AddHeader(header)
        } else if let Some(record) = &self.record_interaction {
            RuleActionKind::RecordInteraction(record)
        } else {
            RuleActionKind::Noop
        }
    }
}

/// Where the agent's own service lives for an activation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequestAction>,
}

/// Request sent by the host at the end of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndAction {
    pub http_request: HttpRequestAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestAction {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddHeaderRuleAction {
    pub header: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInteractionRuleAction {
    pub url: String,
}
