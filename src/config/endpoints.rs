//! Ordered endpoint override rules.

use std::sync::Arc;

use http::Method;
use regex::Regex;

use crate::policy::{EndpointFn, PolicySettings};

/// One override rule: optional method plus a path regex.
#[derive(Debug, Clone)]
pub struct EndpointRule {
    method: Option<Method>,
    pattern: Regex,
    settings: PolicySettings,
}

impl EndpointRule {
    /// Creates a rule; `method = None` matches any method.
    #[must_use]
    pub const fn new(method: Option<Method>, pattern: Regex, settings: PolicySettings) -> Self {
        Self {
            method,
            pattern,
            settings,
        }
    }

    /// Returns true if the rule applies to `method` and `path`.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.is_match(path)
    }

    /// The path pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The override settings.
    #[must_use]
    pub const fn settings(&self) -> &PolicySettings {
        &self.settings
    }
}

/// Endpoint rules tried in order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct EndpointRules {
    rules: Vec<EndpointRule>,
}

impl EndpointRules {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule after the existing ones.
    #[must_use]
    pub fn with(mut self, rule: EndpointRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the settings of the first matching rule.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<PolicySettings> {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.settings.clone())
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Converts the rules into the client's endpoint override function.
    #[must_use]
    pub fn into_endpoint_fn(self) -> EndpointFn {
        Arc::new(move |method: &Method, path: &str| self.lookup(method, path))
    }
}
