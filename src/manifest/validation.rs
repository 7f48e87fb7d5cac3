//! Manifest validation at the deserialization boundary
//!
//! Walks the untyped JSON document and collects every offending field before
//! handing it to serde, so a broken manifest reports all of its problems at
//! once instead of the first one serde trips over.

use super::types::AgentManifest;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {problem}")]
pub struct FieldError {
    /// JSON path of the field, e.g. `onHttpRequest[1].condition.urlRegex`
    pub path: String,
    pub problem: String,
}

/// Manifest validation failure listing every offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_fields(.fields))]
pub struct ManifestError {
    pub fields: Vec<FieldError>,
}

impl ManifestError {
    fn single(path: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            fields: vec![FieldError {
                path: path.into(),
                problem: problem.into(),
            }],
        }
    }

    /// Paths of all offending fields
    pub fn paths(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.path.as_str()).collect()
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Default)]
struct Collector {
    fields: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, path: String, problem: &str) {
        self.fields.push(FieldError {
            path,
            problem: problem.to_string(),
        });
    }

    fn required_string(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        match obj.get(key) {
            Some(Value::String(_)) => {}
            Some(_) => self.push(join(path, key), "expected a string"),
            None => self.push(join(path, key), "missing required field"),
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        match obj.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => self.push(join(path, key), "expected a string"),
        }
    }

    fn optional_string_list(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        match obj.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        self.push(format!("{}[{}]", join(path, key), i), "expected a string");
                    }
                }
            }
            Some(_) => self.push(join(path, key), "expected an array of strings"),
        }
    }

    /// Returns the object at `key` when it is present and is an object
    fn optional_object<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'v Map<String, Value>> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::Object(inner)) => Some(inner),
            Some(_) => {
                self.push(join(path, key), "expected an object");
                None
            }
        }
    }

    fn http_request(&mut self, obj: &Map<String, Value>, path: &str) {
        self.required_string(obj, "url", path);
        self.optional_string(obj, "method", path);
    }

    fn rule(&mut self, rule: &Value, path: &str) {
        let Some(rule) = rule.as_object() else {
            self.push(path.to_string(), "expected an object");
            return;
        };

        match rule.get("condition") {
            Some(Value::Object(condition)) => {
                let cond_path = join(path, "condition");
                match condition.get("urlRegex") {
                    Some(Value::String(pattern)) => {
                        if let Err(e) = regex::Regex::new(pattern) {
                            self.push(
                                join(&cond_path, "urlRegex"),
                                &format!("invalid regex: {}", e),
                            );
                        }
                    }
                    Some(_) => self.push(join(&cond_path, "urlRegex"), "expected a string"),
                    None => self.push(join(&cond_path, "urlRegex"), "missing required field"),
                }
                self.optional_string_list(condition, "requestMethods", &cond_path);
                self.optional_string_list(condition, "resourceTypes", &cond_path);
            }
            Some(_) => self.push(join(path, "condition"), "expected an object"),
            None => self.push(join(path, "condition"), "missing required field"),
        }

        match rule.get("actions") {
            Some(Value::Array(actions)) => {
                for (i, action) in actions.iter().enumerate() {
                    self.action(action, &format!("{}.actions[{}]", path, i));
                }
            }
            Some(_) => self.push(join(path, "actions"), "expected an array"),
            None => self.push(join(path, "actions"), "missing required field"),
        }
    }

    fn action(&mut self, action: &Value, path: &str) {
        let Some(action) = action.as_object() else {
            self.push(path.to_string(), "expected an object");
            return;
        };
        if let Some(activate) = self.optional_object(action, "activate", path) {
            let activate_path = join(path, "activate");
            if let Some(req) = self.optional_object(activate, "httpRequest", &activate_path) {
                self.http_request(req, &join(&activate_path, "httpRequest"));
            }
        }
        if let Some(header) = self.optional_object(action, "addHeader", path) {
            let header_path = join(path, "addHeader");
            self.required_string(header, "header", &header_path);
            self.required_string(header, "value", &header_path);
        }
        if let Some(record) = self.optional_object(action, "recordInteraction", path) {
            self.required_string(record, "url", &join(path, "recordInteraction"));
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Validate an untyped manifest document and convert it to [`AgentManifest`]
pub fn validate_manifest(value: Value) -> Result<AgentManifest, ManifestError> {
    let Some(obj) = value.as_object() else {
        return Err(ManifestError::single("", "manifest must be a JSON object"));
    };

    let mut c = Collector::default();
    c.required_string(obj, "id", "");
    if obj.get("id").and_then(Value::as_str).is_some_and(str::is_empty) {
        c.push("id".to_string(), "must not be empty");
    }
    c.required_string(obj, "name", "");
    c.required_string(obj, "welcomeMessage", "");
    c.required_string(obj, "contactEmail", "");
    c.optional_string_list(obj, "capabilities", "");

    match obj.get("prompts") {
        None | Some(Value::Null) => {}
        Some(Value::Array(prompts)) => {
            for (i, prompt) in prompts.iter().enumerate() {
                let path = format!("prompts[{}]", i);
                match prompt.as_object() {
                    Some(p) => {
                        c.required_string(p, "name", &path);
                        c.required_string(p, "text", &path);
                        c.optional_string(p, "shortcut", &path);
                    }
                    None => c.push(path, "expected an object"),
                }
            }
        }
        Some(_) => c.push("prompts".to_string(), "expected an array"),
    }

    if let Some(close) = c.optional_object(obj, "onSessionClose", "") {
        match close.get("httpRequest") {
            Some(Value::Object(req)) => c.http_request(req, "onSessionClose.httpRequest"),
            Some(_) => c.push("onSessionClose.httpRequest".to_string(), "expected an object"),
            None => c.push("onSessionClose.httpRequest".to_string(), "missing required field"),
        }
    }

    match obj.get("onHttpRequest") {
        None | Some(Value::Null) => {}
        Some(Value::Array(rules)) => {
            for (i, rule) in rules.iter().enumerate() {
                c.rule(rule, &format!("onHttpRequest[{}]", i));
            }
        }
        Some(_) => c.push("onHttpRequest".to_string(), "expected an array"),
    }

    if let Some(auth) = c.optional_object(obj, "auth", "") {
        c.required_string(auth, "url", "auth");
        c.required_string(auth, "clientId", "auth");
        c.required_string(auth, "scope", "auth");
    }

    if !c.fields.is_empty() {
        return Err(ManifestError { fields: c.fields });
    }

    serde_json::from_value(value).map_err(|e| ManifestError::single("", e.to_string()))
}
