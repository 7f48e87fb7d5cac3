//! Rule matcher for observed HTTP requests

use crate::error::{Error, Result};
use crate::manifest::{AgentRule, RuleAction, RuleCondition};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// An HTTP request observed by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequestEvent {
    pub url: String,
    pub method: String,
    /// Resource type as reported by the host, e.g. `main_frame`, `script`
    #[serde(rename = "type")]
    pub resource_type: String,
}

impl HttpRequestEvent {
    /// Create a new request event
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            resource_type: resource_type.into(),
        }
    }
}

/// A rule condition with its URL regex compiled
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    url_regex: Regex,
    /// Stored lower-cased
    request_methods: Option<Vec<String>>,
    resource_types: Option<Vec<String>>,
}

impl CompiledCondition {
    /// Compile a declared condition
    pub fn compile(condition: &RuleCondition) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            url_regex: Regex::new(&condition.url_regex)?,
            request_methods: condition
                .request_methods
                .as_ref()
                .map(|methods| methods.iter().map(|m| m.to_lowercase()).collect()),
            resource_types: condition.resource_types.clone(),
        })
    }

    /// Test the condition against a request.
    ///
    /// The regex is unanchored and case-sensitive. Methods compare
    /// case-insensitively, resource types exactly. A missing list matches
    /// anything.
    pub fn matches(&self, request: &HttpRequestEvent) -> bool {
        if !self.url_regex.is_match(&request.url) {
            return false;
        }

        if let Some(methods) = &self.request_methods {
            let method = request.method.to_lowercase();
            if !methods.iter().any(|m| *m == method) {
                return false;
            }
        }

        if let Some(types) = &self.resource_types {
            if !types.iter().any(|t| *t == request.resource_type) {
                return false;
            }
        }

        true
    }
}

/// A declared rule ready for evaluation
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Position of the rule in the manifest
    pub index: usize,
    pub condition: CompiledCondition,
    pub actions: Vec<RuleAction>,
}

impl CompiledRule {
    /// Compile the rule at `index`, failing on an invalid `urlRegex`
    pub fn compile(index: usize, rule: &AgentRule) -> Result<Self> {
        let condition = CompiledCondition::compile(&rule.condition)
            .map_err(|source| Error::InvalidRule { index, source })?;
        Ok(Self {
            index,
            condition,
            actions: rule.actions.clone(),
        })
    }
}

/// Whether `request` satisfies `rule`'s condition
pub fn matches(request: &HttpRequestEvent, rule: &CompiledRule) -> bool {
    rule.condition.matches(request)
}

/// All rules of a manifest, compiled in declaration order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every rule, failing fast on the first invalid one
    pub fn compile(rules: &[AgentRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| CompiledRule::compile(index, rule))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule at manifest position `index`
    pub fn get(&self, index: usize) -> Option<&CompiledRule> {
        self.rules.get(index)
    }

    /// Actions of every matching rule, flattened in manifest-then-rule order
    pub fn matching_actions(&self, request: &HttpRequestEvent) -> Vec<&RuleAction> {
        let actions: Vec<&RuleAction> = self
            .rules
            .iter()
            .filter(|rule| matches(request, rule))
            .flat_map(|rule| rule.actions.iter())
            .collect();
        tracing::debug!(
            "{} rules produced {} actions for {}",
            self.rules.len(),
            actions.len(),
            request.url
        );
        actions
    }
}
