//! Declarative filter policies and party metadata.
//!
//! ```toml
//! [[filter.policies]]
//! id = "research"
//! requirement = { type = "in-entity-group", group = "urn:group:research" }
//!
//! [[filter.policies.rules]]
//! attribute = "eduPersonAffiliation"
//! permit = [{ type = "value-string", value = "member" }]
//! ```

use lanyard_filter::{
    AttributeFilter, AttributeFilterPolicy, AttributeRule, EntityGroup, FilterConfigError,
    MatchRule, Matcher, Party, PartyDescriptor, StaticMetadata, StringMatch, TextTest,
    ValuePattern,
};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// The `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub id: String,
    /// Log one line per withheld attribute.
    pub audit: bool,
    pub policies: Vec<PolicyConfig>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            audit: true,
            policies: Vec::new(),
        }
    }
}

impl FilterConfig {
    pub fn build(&self) -> Result<AttributeFilter, ConfigError> {
        let mut builder = AttributeFilter::builder(&self.id);
        if !self.audit {
            builder = builder.without_audit();
        }
        for policy in &self.policies {
            builder = builder.with_policy(policy.build()?);
        }
        Ok(builder.build()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub id: String,
    pub requirement: MatcherConfig,
    #[serde(default)]
    pub rules: Vec<AttributeRuleConfig>,
}

impl PolicyConfig {
    fn build(&self) -> Result<AttributeFilterPolicy, FilterConfigError> {
        let mut policy = AttributeFilterPolicy::new(&self.id, self.requirement.build()?);
        for rule in &self.rules {
            policy = policy.with_rule(rule.build()?);
        }
        Ok(policy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeRuleConfig {
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permit: Vec<MatcherConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<MatcherConfig>,
}

impl AttributeRuleConfig {
    fn build(&self) -> Result<AttributeRule, FilterConfigError> {
        let mut rule = AttributeRule::new(&self.attribute);
        for permit in &self.permit {
            rule = rule.permit(permit.build()?);
        }
        for deny in &self.deny {
            rule = rule.deny(deny.build()?);
        }
        Ok(rule)
    }
}

// ============================================================================
// Matchers
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartyConfig {
    #[default]
    Requester,
    Issuer,
}

impl From<PartyConfig> for Party {
    fn from(value: PartyConfig) -> Self {
        match value {
            PartyConfig::Requester => Party::Requester,
            PartyConfig::Issuer => Party::Issuer,
        }
    }
}

fn default_case_sensitive() -> bool {
    true
}

/// A rule tree node as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MatcherConfig {
    Any,
    And {
        rules: Vec<MatcherConfig>,
    },
    Or {
        rules: Vec<MatcherConfig>,
    },
    Not {
        rule: Box<MatcherConfig>,
    },
    RequesterString {
        value: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    RequesterRegex {
        pattern: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    IssuerString {
        value: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    IssuerRegex {
        pattern: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    PrincipalString {
        value: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    PrincipalRegex {
        pattern: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    /// Without `attribute`, tests the value being filtered.
    ValueString {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        value: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    ValueRegex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        pattern: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    ScopeString {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        value: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    ScopeRegex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        pattern: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    InEntityGroup {
        #[serde(default)]
        party: PartyConfig,
        group: String,
    },
    EntityAttributeString {
        #[serde(default)]
        party: PartyConfig,
        attribute: String,
        value: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    EntityAttributeRegex {
        #[serde(default)]
        party: PartyConfig,
        attribute: String,
        pattern: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
}

fn string_test(value: &str, case_sensitive: bool) -> TextTest {
    if case_sensitive {
        StringMatch::exact(value).into()
    } else {
        StringMatch::ignore_case(value).into()
    }
}

fn regex_test(pattern: &str, case_sensitive: bool) -> Result<TextTest, FilterConfigError> {
    let pattern = if case_sensitive {
        ValuePattern::new(pattern)?
    } else {
        ValuePattern::ignore_case(pattern)?
    };
    Ok(pattern.into())
}

impl MatcherConfig {
    pub fn build(&self) -> Result<MatchRule, FilterConfigError> {
        let matcher = match self {
            MatcherConfig::Any => Matcher::Any,
            MatcherConfig::And { rules } => {
                return Ok(MatchRule::And(
                    rules.iter().map(MatcherConfig::build).collect::<Result<_, _>>()?,
                ));
            }
            MatcherConfig::Or { rules } => {
                return Ok(MatchRule::Or(
                    rules.iter().map(MatcherConfig::build).collect::<Result<_, _>>()?,
                ));
            }
            MatcherConfig::Not { rule } => return Ok(MatchRule::not(rule.build()?)),
            MatcherConfig::RequesterString {
                value,
                case_sensitive,
            } => Matcher::requester(string_test(value, *case_sensitive)),
            MatcherConfig::RequesterRegex {
                pattern,
                case_sensitive,
            } => Matcher::requester(regex_test(pattern, *case_sensitive)?),
            MatcherConfig::IssuerString {
                value,
                case_sensitive,
            } => Matcher::issuer(string_test(value, *case_sensitive)),
            MatcherConfig::IssuerRegex {
                pattern,
                case_sensitive,
            } => Matcher::issuer(regex_test(pattern, *case_sensitive)?),
            MatcherConfig::PrincipalString {
                value,
                case_sensitive,
            } => Matcher::Principal(string_test(value, *case_sensitive)),
            MatcherConfig::PrincipalRegex {
                pattern,
                case_sensitive,
            } => Matcher::Principal(regex_test(pattern, *case_sensitive)?),
            MatcherConfig::ValueString {
                attribute,
                value,
                case_sensitive,
            } => Matcher::AttributeValue {
                attribute_id: attribute.clone(),
                test: string_test(value, *case_sensitive),
            },
            MatcherConfig::ValueRegex {
                attribute,
                pattern,
                case_sensitive,
            } => Matcher::AttributeValue {
                attribute_id: attribute.clone(),
                test: regex_test(pattern, *case_sensitive)?,
            },
            MatcherConfig::ScopeString {
                attribute,
                value,
                case_sensitive,
            } => Matcher::AttributeScope {
                attribute_id: attribute.clone(),
                test: string_test(value, *case_sensitive),
            },
            MatcherConfig::ScopeRegex {
                attribute,
                pattern,
                case_sensitive,
            } => Matcher::AttributeScope {
                attribute_id: attribute.clone(),
                test: regex_test(pattern, *case_sensitive)?,
            },
            MatcherConfig::InEntityGroup { party, group } => {
                if group.trim().is_empty() {
                    return Err(FilterConfigError::BlankEntityGroup);
                }
                Matcher::InEntityGroup {
                    party: (*party).into(),
                    group: group.clone(),
                }
            }
            MatcherConfig::EntityAttributeString {
                party,
                attribute,
                value,
                case_sensitive,
            } => Matcher::EntityAttribute {
                party: (*party).into(),
                attribute: attribute.clone(),
                test: string_test(value, *case_sensitive),
            },
            MatcherConfig::EntityAttributeRegex {
                party,
                attribute,
                pattern,
                case_sensitive,
            } => Matcher::EntityAttribute {
                party: (*party).into(),
                attribute: attribute.clone(),
                test: regex_test(pattern, *case_sensitive)?,
            },
        };
        Ok(matcher.into())
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// The `[metadata]` section: statically configured parties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub parties: Vec<PartyMetadataConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyMetadataConfig {
    pub entity_id: String,
    /// Group chain, innermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<EntityAttributeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAttributeConfig {
    pub name: String,
    pub values: Vec<String>,
}

impl MetadataConfig {
    pub fn build(&self) -> StaticMetadata {
        self.parties
            .iter()
            .fold(StaticMetadata::new(), |metadata, party| {
                let mut descriptor = PartyDescriptor::new(&party.entity_id);
                if let Some(group) = EntityGroup::chain(party.groups.iter().cloned()) {
                    descriptor = descriptor.with_group(group);
                }
                for attribute in &party.attributes {
                    descriptor =
                        descriptor.with_attribute(&attribute.name, attribute.values.iter().cloned());
                }
                metadata.with_party(descriptor)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanyard_filter::{FilterContext, PartyMetadataLookup, Tristate};
    use lanyard_types::{Attribute, AttributeMap};
    use test_case::test_case;

    fn parse_filter(toml_src: &str) -> FilterConfig {
        toml::from_str(toml_src).expect("Failed to parse filter config")
    }

    fn affiliation() -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert(
            "eduPersonAffiliation".into(),
            Attribute::new("eduPersonAffiliation").with_values(["member", "staff"]),
        );
        map
    }

    #[test]
    fn test_parse_and_build_policy() {
        let config = parse_filter(
            r#"
[[policies]]
id = "sp"
requirement = { type = "requester-string", value = "https://sp.example.org" }

[[policies.rules]]
attribute = "eduPersonAffiliation"
permit = [{ type = "value-regex", pattern = "mem.*" }]
deny = [{ type = "not", rule = { type = "any" } }]
"#,
        );

        let filter = config.build().expect("Failed to build filter");
        let mut ctx = FilterContext::new(affiliation()).with_requester("https://sp.example.org");
        let report = filter.filter(&mut ctx);

        assert_eq!(report.outcome("sp"), Some(Tristate::True));
        assert_eq!(ctx.filtered_attributes()["eduPersonAffiliation"].len(), 1);
    }

    #[test_case(r#"{ type = "requester-string", value = "HTTPS://SP.EXAMPLE.ORG", case_sensitive = false }"#, Tristate::True; "ignore case")]
    #[test_case(r#"{ type = "requester-string", value = "HTTPS://SP.EXAMPLE.ORG" }"#, Tristate::False; "case sensitive by default")]
    #[test_case(r#"{ type = "or", rules = [{ type = "principal-string", value = "bob" }, { type = "any" }] }"#, Tristate::True; "or")]
    #[test_case(r#"{ type = "issuer-regex", pattern = ".*" }"#, Tristate::Fail; "missing issuer")]
    fn test_requirement_matchers(requirement: &str, expected: Tristate) {
        let config = parse_filter(&format!(
            r#"
[[policies]]
id = "p"
requirement = {requirement}
"#
        ));
        let filter = config.build().expect("Failed to build filter");
        let mut ctx = FilterContext::new(AttributeMap::new())
            .with_principal("alice")
            .with_requester("https://sp.example.org");
        let report = filter.filter(&mut ctx);

        assert_eq!(report.outcome("p"), Some(expected));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = parse_filter(
            r#"
[[policies]]
id = "p"
requirement = { type = "requester-regex", pattern = "(" }
"#,
        );
        assert!(matches!(
            config.build(),
            Err(ConfigError::FilterError(FilterConfigError::InvalidPattern { .. }))
        ));
    }

    #[test]
    fn test_empty_rule_is_rejected() {
        let config = parse_filter(
            r#"
[[policies]]
id = "p"
requirement = { type = "any" }

[[policies.rules]]
attribute = "mail"
"#,
        );
        assert!(matches!(
            config.build(),
            Err(ConfigError::FilterError(FilterConfigError::EmptyRule { .. }))
        ));
    }

    #[test]
    fn test_blank_entity_group_is_rejected() {
        let config = parse_filter(
            r#"
[[policies]]
id = "p"
requirement = { type = "in-entity-group", group = "" }
"#,
        );
        assert!(matches!(
            config.build(),
            Err(ConfigError::FilterError(FilterConfigError::BlankEntityGroup))
        ));
    }

    #[test]
    fn test_metadata_builds_group_chain() {
        let config: MetadataConfig = toml::from_str(
            r#"
[[parties]]
entity_id = "https://sp.example.org"
groups = ["urn:group:lab", "urn:group:research"]
attributes = [{ name = "http://macedir.org/entity-category", values = ["research"] }]
"#,
        )
        .expect("Failed to parse metadata");

        let metadata = config.build();
        let descriptor = metadata
            .lookup("https://sp.example.org")
            .expect("party missing");
        let group = descriptor.group.expect("group missing");
        assert!(group.is_within("urn:group:research"));
        assert_eq!(descriptor.attributes["http://macedir.org/entity-category"], vec!["research"]);
    }
}
