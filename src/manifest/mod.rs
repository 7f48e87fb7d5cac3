//! Agent manifest model
//!
//! The manifest is the declarative document an agent publishes: identity,
//! prompts, auth settings and the rules that decide when it activates on
//! observed HTTP traffic.

mod types;
mod validation;

pub use types::{
    ActivationAction, AddHeaderRuleAction, AgentManifest, AgentRule, AuthConfig, EndAction,
    HttpRequestAction, Prompt, RecordInteractionRuleAction, RuleAction, RuleActionKind,
    RuleCondition,
};
pub use validation::{validate_manifest, FieldError, ManifestError};

impl AgentManifest {
    /// Parse an untyped JSON document, reporting every offending field
    pub fn from_value(value: serde_json::Value) -> Result<Self, ManifestError> {
        validate_manifest(value)
    }
}
