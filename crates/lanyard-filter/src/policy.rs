//! Attribute filter policies.
//!
//! A policy applies only when its requirement rule evaluates to `True`. Its
//! attribute rules then decide which values may be released.

use crate::error::Result;
use crate::rule::{AttributeRule, MatchRule};

/// A requirement plus the attribute rules it guards.
#[derive(Debug, Clone)]
pub struct AttributeFilterPolicy {
    id: String,
    requirement: MatchRule,
    rules: Vec<AttributeRule>,
}

impl AttributeFilterPolicy {
    pub fn new(id: impl Into<String>, requirement: impl Into<MatchRule>) -> Self {
        Self {
            id: id.into(),
            requirement: requirement.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: AttributeRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn requirement(&self) -> &MatchRule {
        &self.requirement
    }

    pub fn rules(&self) -> &[AttributeRule] {
        &self.rules
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.requirement.validate(&self.id, "requirement")?;
        for rule in &self.rules {
            rule.validate(&self.id)?;
        }
        Ok(())
    }
}
