//! Rule evaluation against observed HTTP traffic
//!
//! - [`matcher`]: compiled conditions and the `matches` predicate
//! - [`activation`]: selection of the rule that activates an agent

pub mod activation;
pub mod matcher;

pub use activation::{select_activation, ActivationRule};
pub use matcher::{matches, CompiledCondition, CompiledRule, HttpRequestEvent, RuleSet};
