//! Rule trees and attribute rules.

use lanyard_types::AttributeValue;

use crate::context::FilterContext;
use crate::error::{FilterConfigError, Result};
use crate::matcher::Matcher;
use crate::tristate::Tristate;

// ============================================================================
// Match rule tree
// ============================================================================

/// A tri-state boolean tree over matchers.
///
/// Used both as a policy requirement (evaluated once per request) and as a
/// permit or deny rule (evaluated once per attribute value).
#[derive(Debug, Clone)]
pub enum MatchRule {
    Matcher(Matcher),
    And(Vec<MatchRule>),
    Or(Vec<MatchRule>),
    Not(Box<MatchRule>),
}

impl MatchRule {
    pub fn not(rule: MatchRule) -> Self {
        MatchRule::Not(Box::new(rule))
    }

    /// Evaluates against the request.
    pub fn evaluate_request(&self, ctx: &FilterContext) -> Tristate {
        self.evaluate_with(&|matcher| matcher.evaluate_request(ctx))
    }

    /// Evaluates against one value of `attribute_id`.
    pub fn evaluate_value(
        &self,
        ctx: &FilterContext,
        attribute_id: &str,
        value: &AttributeValue,
    ) -> Tristate {
        self.evaluate_with(&|matcher| matcher.evaluate_value(ctx, attribute_id, value))
    }

    fn evaluate_with(&self, leaf: &dyn Fn(&Matcher) -> Tristate) -> Tristate {
        match self {
            MatchRule::Matcher(matcher) => leaf(matcher),
            MatchRule::And(children) => Tristate::all(children.iter().map(|c| c.evaluate_with(leaf))),
            MatchRule::Or(children) => Tristate::any(children.iter().map(|c| c.evaluate_with(leaf))),
            MatchRule::Not(child) => !child.evaluate_with(leaf),
        }
    }

    /// Rejects AND/OR nodes without children.
    pub fn validate(&self, policy: &str, location: &str) -> Result<()> {
        match self {
            MatchRule::Matcher(_) => Ok(()),
            MatchRule::And(children) | MatchRule::Or(children) => {
                if children.is_empty() {
                    return Err(FilterConfigError::EmptyCombinator {
                        policy: policy.to_string(),
                        combinator: if matches!(self, MatchRule::And(_)) { "AND" } else { "OR" },
                        location: location.to_string(),
                    });
                }
                children
                    .iter()
                    .try_for_each(|child| child.validate(policy, location))
            }
            MatchRule::Not(child) => child.validate(policy, location),
        }
    }
}

impl From<Matcher> for MatchRule {
    fn from(matcher: Matcher) -> Self {
        MatchRule::Matcher(matcher)
    }
}

// ============================================================================
// Attribute rule
// ============================================================================

/// Which values of one attribute a policy permits or denies.
#[derive(Debug, Clone)]
pub struct AttributeRule {
    attribute_id: String,
    permit: Vec<MatchRule>,
    deny: Vec<MatchRule>,
}

impl AttributeRule {
    pub fn new(attribute_id: impl Into<String>) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            permit: Vec::new(),
            deny: Vec::new(),
        }
    }

    pub fn permit(mut self, rule: impl Into<MatchRule>) -> Self {
        self.permit.push(rule.into());
        self
    }

    pub fn deny(mut self, rule: impl Into<MatchRule>) -> Self {
        self.deny.push(rule.into());
        self
    }

    pub fn attribute_id(&self) -> &str {
        &self.attribute_id
    }

    /// Outcome of the permit rules for one value: `True` if any permits it.
    pub fn permits(&self, ctx: &FilterContext, value: &AttributeValue) -> Tristate {
        Tristate::any(
            self.permit
                .iter()
                .map(|rule| rule.evaluate_value(ctx, &self.attribute_id, value)),
        )
    }

    /// Outcome of the deny rules for one value: `True` if any denies it.
    pub fn denies(&self, ctx: &FilterContext, value: &AttributeValue) -> Tristate {
        Tristate::any(
            self.deny
                .iter()
                .map(|rule| rule.evaluate_value(ctx, &self.attribute_id, value)),
        )
    }

    pub fn has_permits(&self) -> bool {
        !self.permit.is_empty()
    }

    pub fn has_denies(&self) -> bool {
        !self.deny.is_empty()
    }

    pub(crate) fn validate(&self, policy: &str) -> Result<()> {
        if self.attribute_id.trim().is_empty() {
            return Err(FilterConfigError::MissingAttributeId {
                policy: policy.to_string(),
            });
        }
        if self.permit.is_empty() && self.deny.is_empty() {
            return Err(FilterConfigError::EmptyRule {
                policy: policy.to_string(),
                attribute: self.attribute_id.clone(),
            });
        }
        let permit_location = format!("permit rule for '{}'", self.attribute_id);
        for rule in &self.permit {
            rule.validate(policy, &permit_location)?;
        }
        let deny_location = format!("deny rule for '{}'", self.attribute_id);
        for rule in &self.deny {
            rule.validate(policy, &deny_location)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::StringMatch;

    fn leaf(result: bool) -> MatchRule {
        if result {
            Matcher::Any.into()
        } else {
            MatchRule::not(Matcher::Any.into())
        }
    }

    fn failing() -> MatchRule {
        // no requester in the context
        Matcher::requester(StringMatch::exact("https://sp.example.org")).into()
    }

    #[test]
    fn test_or_with_true_ignores_failure() {
        let rule = MatchRule::Or(vec![leaf(false), failing(), leaf(true)]);
        assert_eq!(rule.evaluate_request(&FilterContext::default()), Tristate::True);
    }

    #[test]
    fn test_and_with_failure_fails() {
        let rule = MatchRule::And(vec![leaf(false), failing()]);
        assert_eq!(rule.evaluate_request(&FilterContext::default()), Tristate::Fail);
    }

    #[test]
    fn test_not_failure_is_failure() {
        let rule = MatchRule::not(failing());
        assert_eq!(rule.evaluate_request(&FilterContext::default()), Tristate::Fail);
    }

    #[test]
    fn test_empty_combinators_are_rejected() {
        let nested = MatchRule::not(MatchRule::And(vec![]));
        assert!(matches!(
            nested.validate("p", "requirement"),
            Err(FilterConfigError::EmptyCombinator { combinator: "AND", .. })
        ));
        assert!(MatchRule::Or(vec![]).validate("p", "requirement").is_err());
        assert!(MatchRule::Or(vec![leaf(true)]).validate("p", "requirement").is_ok());
    }

    #[test]
    fn test_rule_without_matchers_is_rejected() {
        assert!(matches!(
            AttributeRule::new("mail").validate("p"),
            Err(FilterConfigError::EmptyRule { .. })
        ));
    }

    #[test]
    fn test_permits_any_matching_rule() {
        let rule = AttributeRule::new("eduPersonAffiliation")
            .permit(Matcher::value(StringMatch::exact("member")))
            .permit(Matcher::value(StringMatch::exact("student")));
        let ctx = FilterContext::default();
        assert_eq!(rule.permits(&ctx, &AttributeValue::string("student")), Tristate::True);
        assert_eq!(rule.permits(&ctx, &AttributeValue::string("staff")), Tristate::False);
    }
}
