//! Leaf predicates over a request or a single attribute value.
//!
//! Matchers come in two flavours:
//!
//! - **Request-level** matchers look at the request (requester, issuer,
//!   principal, metadata, other attributes). Used as a permit or deny
//!   matcher they apply uniformly to every value.
//! - **Value-level** matchers look at the value being filtered. Used as a
//!   policy requirement without a target attribute they cannot evaluate
//!   and return `Fail`.
//!
//! A matcher never returns an error: anything it cannot evaluate is
//! logged and reported as [`Tristate::Fail`].

use lanyard_types::AttributeValue;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::context::{FilterContext, Party};
use crate::error::{FilterConfigError, Result};
use crate::tristate::Tristate;

// ============================================================================
// Value tests
// ============================================================================

/// Exact string comparison, optionally ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMatch {
    pub value: String,
    pub case_sensitive: bool,
}

impl StringMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            case_sensitive: true,
        }
    }

    pub fn ignore_case(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            case_sensitive: false,
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.case_sensitive {
            self.value == candidate
        } else {
            self.value.to_lowercase() == candidate.to_lowercase()
        }
    }
}

/// A regular expression that must match the whole candidate.
#[derive(Debug, Clone)]
pub struct ValuePattern {
    source: String,
    anchored: Regex,
}

impl ValuePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Self::build(pattern, true)
    }

    pub fn ignore_case(pattern: &str) -> Result<Self> {
        Self::build(pattern, false)
    }

    fn build(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let anchored = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| FilterConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            source: pattern.to_string(),
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.anchored.is_match(candidate)
    }
}

/// Either an exact string or a pattern.
#[derive(Debug, Clone)]
pub enum TextTest {
    String(StringMatch),
    Regex(ValuePattern),
}

impl TextTest {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            TextTest::String(m) => m.matches(candidate),
            TextTest::Regex(p) => p.matches(candidate),
        }
    }
}

impl From<StringMatch> for TextTest {
    fn from(value: StringMatch) -> Self {
        TextTest::String(value)
    }
}

impl From<ValuePattern> for TextTest {
    fn from(value: ValuePattern) -> Self {
        TextTest::Regex(value)
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// A leaf predicate.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Always `True`.
    Any,
    /// Tests the requester's or issuer's entity id.
    PartyId { party: Party, test: TextTest },
    /// Tests the principal name.
    Principal(TextTest),
    /// Tests the textual part of attribute values.
    ///
    /// With `attribute_id` set, becomes a request-level check: `True` if
    /// any value of that attribute passes.
    AttributeValue {
        attribute_id: Option<String>,
        test: TextTest,
    },
    /// Tests the scope of scoped attribute values.
    AttributeScope {
        attribute_id: Option<String>,
        test: TextTest,
    },
    /// The party belongs to `group` at any depth of its group chain.
    InEntityGroup { party: Party, group: String },
    /// The party's metadata carries an entity attribute value that passes.
    EntityAttribute {
        party: Party,
        attribute: String,
        test: TextTest,
    },
}

impl Matcher {
    pub fn requester(test: impl Into<TextTest>) -> Self {
        Matcher::PartyId {
            party: Party::Requester,
            test: test.into(),
        }
    }

    pub fn issuer(test: impl Into<TextTest>) -> Self {
        Matcher::PartyId {
            party: Party::Issuer,
            test: test.into(),
        }
    }

    pub fn value(test: impl Into<TextTest>) -> Self {
        Matcher::AttributeValue {
            attribute_id: None,
            test: test.into(),
        }
    }

    pub fn scope(test: impl Into<TextTest>) -> Self {
        Matcher::AttributeScope {
            attribute_id: None,
            test: test.into(),
        }
    }

    pub fn requester_in_group(group: impl Into<String>) -> Self {
        Matcher::InEntityGroup {
            party: Party::Requester,
            group: group.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Matcher::Any => "any",
            Matcher::PartyId { .. } => "party-id",
            Matcher::Principal(_) => "principal",
            Matcher::AttributeValue { .. } => "attribute-value",
            Matcher::AttributeScope { .. } => "attribute-scope",
            Matcher::InEntityGroup { .. } => "in-entity-group",
            Matcher::EntityAttribute { .. } => "entity-attribute",
        }
    }

    /// Evaluates the matcher against the request as a whole.
    pub fn evaluate_request(&self, ctx: &FilterContext) -> Tristate {
        match self {
            Matcher::Any => Tristate::True,
            Matcher::PartyId { party, test } => match ctx.party(*party) {
                Some(id) => test.matches(id).into(),
                None => self.fail(&format!("request has no {party}")),
            },
            Matcher::Principal(test) => match ctx.principal() {
                Some(principal) => test.matches(principal).into(),
                None => self.fail("request has no principal"),
            },
            Matcher::AttributeValue {
                attribute_id: Some(target),
                test,
            } => any_value(ctx, target, |v| v.as_str().is_some_and(|s| test.matches(s))),
            Matcher::AttributeScope {
                attribute_id: Some(target),
                test,
            } => any_value(ctx, target, |v| v.scope().is_some_and(|s| test.matches(s))),
            Matcher::AttributeValue {
                attribute_id: None, ..
            }
            | Matcher::AttributeScope {
                attribute_id: None, ..
            } => self.fail("value matcher used without a target attribute"),
            Matcher::InEntityGroup { party, group } => {
                if group.trim().is_empty() {
                    return self.fail("no group id configured");
                }
                let Some(descriptor) = ctx.metadata(*party) else {
                    return self.fail(&format!("no metadata for {party}"));
                };
                let Some(chain) = descriptor.group.as_ref() else {
                    return self.fail(&format!("{party} '{}' has no entity group", descriptor.entity_id));
                };
                chain.is_within(group).into()
            }
            Matcher::EntityAttribute {
                party,
                attribute,
                test,
            } => {
                let Some(descriptor) = ctx.metadata(*party) else {
                    return self.fail(&format!("no metadata for {party}"));
                };
                descriptor
                    .attributes
                    .get(attribute)
                    .is_some_and(|values| values.iter().any(|v| test.matches(v)))
                    .into()
            }
        }
    }

    /// Evaluates the matcher against one value of `attribute_id`.
    pub fn evaluate_value(
        &self,
        ctx: &FilterContext,
        attribute_id: &str,
        value: &AttributeValue,
    ) -> Tristate {
        match self {
            Matcher::AttributeValue {
                attribute_id: target,
                test,
            } if target.as_deref().is_none_or(|t| t == attribute_id) => {
                value.as_str().is_some_and(|s| test.matches(s)).into()
            }
            Matcher::AttributeScope {
                attribute_id: target,
                test,
            } if target.as_deref().is_none_or(|t| t == attribute_id) => {
                value.scope().is_some_and(|s| test.matches(s)).into()
            }
            _ => self.evaluate_request(ctx),
        }
    }

    fn fail(&self, reason: &str) -> Tristate {
        warn!(matcher = self.name(), reason, "matcher could not be evaluated");
        Tristate::Fail
    }
}

fn any_value(
    ctx: &FilterContext,
    attribute_id: &str,
    mut test: impl FnMut(&AttributeValue) -> bool,
) -> Tristate {
    ctx.unfiltered_attributes()
        .get(attribute_id)
        .is_some_and(|attribute| attribute.values().iter().any(&mut test))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityGroup, PartyDescriptor};
    use lanyard_types::{Attribute, AttributeMap};
    use test_case::test_case;

    fn research_sp() -> PartyDescriptor {
        PartyDescriptor::new("https://sp.example.org")
            .with_group(
                EntityGroup::chain(["urn:group:lab", "urn:group:research", "urn:group:all"])
                    .unwrap(),
            )
            .with_attribute("http://macedir.org/entity-category", [
                "http://refeds.org/category/research-and-scholarship",
            ])
    }

    #[test_case("urn:group:research", Tristate::True; "ancestor")]
    #[test_case("urn:group:lab", Tristate::True; "direct")]
    #[test_case("urn:group:finance", Tristate::False; "absent")]
    fn test_entity_group_walks_chain(group: &str, expected: Tristate) {
        let ctx = FilterContext::default()
            .with_requester("https://sp.example.org")
            .with_requester_metadata(research_sp());
        assert_eq!(
            Matcher::requester_in_group(group).evaluate_request(&ctx),
            expected
        );
    }

    #[test]
    fn test_blank_entity_group_fails() {
        let ctx = FilterContext::default()
            .with_requester("https://sp.example.org")
            .with_requester_metadata(research_sp());
        assert_eq!(Matcher::requester_in_group("  ").evaluate_request(&ctx), Tristate::Fail);
    }

    #[test]
    fn test_entity_group_without_metadata_fails() {
        let ctx = FilterContext::default().with_requester("https://sp.example.org");
        assert_eq!(
            Matcher::requester_in_group("urn:group:research").evaluate_request(&ctx),
            Tristate::Fail
        );
    }

    #[test]
    fn test_entity_group_without_group_fails() {
        let ctx = FilterContext::default()
            .with_requester("https://sp.example.org")
            .with_requester_metadata(PartyDescriptor::new("https://sp.example.org"));
        assert_eq!(
            Matcher::requester_in_group("urn:group:research").evaluate_request(&ctx),
            Tristate::Fail
        );
    }

    #[test]
    fn test_entity_attribute_regex() {
        let ctx = FilterContext::default()
            .with_requester("https://sp.example.org")
            .with_requester_metadata(research_sp());
        let matcher = Matcher::EntityAttribute {
            party: Party::Requester,
            attribute: "http://macedir.org/entity-category".into(),
            test: ValuePattern::new(".*research-and-scholarship").unwrap().into(),
        };
        assert_eq!(matcher.evaluate_request(&ctx), Tristate::True);
    }

    #[test_case(StringMatch::exact("member"), "member", true)]
    #[test_case(StringMatch::exact("member"), "Member", false)]
    #[test_case(StringMatch::ignore_case("member"), "MEMBER", true)]
    fn test_string_match(matcher: StringMatch, candidate: &str, expected: bool) {
        assert_eq!(matcher.matches(candidate), expected);
    }

    #[test]
    fn test_regex_must_match_whole_value() {
        let pattern = ValuePattern::new("mem").unwrap();
        assert!(!pattern.matches("member"));
        assert!(ValuePattern::new("mem.*").unwrap().matches("member"));
        assert!(ValuePattern::ignore_case("MEM.*").unwrap().matches("member"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        assert!(matches!(
            ValuePattern::new("(unclosed"),
            Err(FilterConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_value_matcher_as_requirement_fails() {
        let matcher = Matcher::value(StringMatch::exact("member"));
        assert_eq!(
            matcher.evaluate_request(&FilterContext::default()),
            Tristate::Fail
        );
    }

    #[test]
    fn test_targeted_value_matcher_checks_other_attribute() {
        let mut attributes = AttributeMap::new();
        attributes.insert(
            "entitlement".into(),
            Attribute::new("entitlement").with_value("urn:example:vip"),
        );
        let ctx = FilterContext::new(attributes);
        let matcher = Matcher::AttributeValue {
            attribute_id: Some("entitlement".into()),
            test: StringMatch::exact("urn:example:vip").into(),
        };

        assert_eq!(matcher.evaluate_request(&ctx), Tristate::True);
        // applied to a value of a different attribute it is request-level
        assert_eq!(
            matcher.evaluate_value(&ctx, "mail", &AttributeValue::string("x@example.org")),
            Tristate::True
        );
    }

    #[test]
    fn test_scope_matcher_ignores_unscoped_values() {
        let matcher = Matcher::scope(StringMatch::exact("example.org"));
        let ctx = FilterContext::default();
        assert_eq!(
            matcher.evaluate_value(&ctx, "eppn", &AttributeValue::scoped("alice", "example.org")),
            Tristate::True
        );
        assert_eq!(
            matcher.evaluate_value(&ctx, "eppn", &AttributeValue::string("alice")),
            Tristate::False
        );
    }

    #[test]
    fn test_request_matcher_applies_uniformly_to_values() {
        let ctx = FilterContext::default().with_requester("https://sp.example.org");
        let matcher = Matcher::requester(StringMatch::exact("https://sp.example.org"));
        for value in ["a", "b", "c"] {
            assert_eq!(
                matcher.evaluate_value(&ctx, "x", &AttributeValue::string(value)),
                Tristate::True
            );
        }
    }

    #[test]
    fn test_missing_requester_fails() {
        let matcher = Matcher::requester(StringMatch::exact("https://sp.example.org"));
        assert_eq!(
            matcher.evaluate_request(&FilterContext::default()),
            Tristate::Fail
        );
    }
}
