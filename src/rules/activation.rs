//! Activation rule selection
//!
//! A manifest may declare many rules for header injection or interaction
//! recording, but only the first one carrying an `activate` directive decides
//! whether the agent attaches to a request. It is selected once per agent.

use crate::manifest::{ActivationAction, AgentRule};

/// The rule that turns an agent on, with its activation directive
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRule {
    /// Position of the rule in the manifest
    pub index: usize,
    pub action: ActivationAction,
}

/// Pick the first rule, in declaration order, whose actions include `activate`
pub fn select_activation(rules: &[AgentRule]) -> Option<ActivationRule> {
    rules.iter().enumerate().find_map(|(index, rule)| {
        rule.activation().map(|action| ActivationRule {
            index,
            action: action.clone(),
        })
    })
}
