use lanyard_types::{AttributeMap, AttributeValue, PluginId};
use regex::{Regex, RegexBuilder};

use crate::error::{PluginError, ResolverConfigError};

/// Splits values with a capture-group pattern.
///
/// A value must match the whole pattern; its first capture group becomes an
/// output value. Values that do not match are dropped.
#[derive(Debug, Clone)]
pub struct RegexSplit {
    pattern: String,
    anchored: Regex,
}

impl RegexSplit {
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        let anchored = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(!case_sensitive)
            .build()?;
        Ok(Self {
            pattern: pattern.to_string(),
            anchored,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub(super) fn split(&self, dependencies: &AttributeMap) -> Result<Vec<AttributeValue>, PluginError> {
        let mut out = Vec::new();
        for value in dependencies.values().flat_map(|a| a.values()) {
            let text = match value {
                AttributeValue::String(s) => s.as_str(),
                AttributeValue::Scoped(scoped) => scoped.value.as_str(),
                other => {
                    return Err(PluginError::UnsupportedValueType {
                        expected: "string",
                        actual: other.kind(),
                    });
                }
            };
            if let Some(group) = self.anchored.captures(text).and_then(|c| c.get(1)) {
                out.push(AttributeValue::string(group.as_str()));
            }
        }
        Ok(out)
    }

    pub(super) fn check_settings(
        &self,
        plugin: &PluginId,
        dependency_count: usize,
    ) -> Result<(), ResolverConfigError> {
        if dependency_count == 0 {
            return Err(ResolverConfigError::MissingSetting {
                plugin: plugin.clone(),
                setting: "dependency",
            });
        }
        if self.anchored.captures_len() < 2 {
            return Err(ResolverConfigError::InvalidSetting {
                plugin: plugin.clone(),
                reason: format!("pattern '{}' has no capture group", self.pattern),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanyard_types::Attribute;
    use test_case::test_case;

    fn deps(values: &[&str]) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert("mail".into(), Attribute::new("mail").with_values(values.iter().copied()));
        map
    }

    #[test_case(&["alice@example.org"], &["alice"]; "match")]
    #[test_case(&["alice@other.org"], &[]; "no match")]
    #[test_case(&["alice@example.org", "bob@example.org", "eve@evil.org"], &["alice", "bob"]; "mixed")]
    #[test_case(&["alice@example.org.evil"], &[]; "trailing text is not a match")]
    fn splits_matching_values(input: &[&str], expected: &[&str]) {
        let split = RegexSplit::new(r"(.+)@example\.org", true).unwrap();
        let values = split.split(&deps(input)).unwrap();
        let expected: Vec<_> = expected.iter().map(|s| AttributeValue::string(*s)).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn unmatched_group_yields_nothing() {
        let split = RegexSplit::new("(a)|ab", true).unwrap();
        assert!(split.split(&deps(&["ab"])).unwrap().is_empty());
    }

    #[test]
    fn case_insensitive_patterns() {
        let split = RegexSplit::new(r"(.+)@EXAMPLE\.ORG", false).unwrap();
        assert_eq!(
            split.split(&deps(&["alice@example.org"])).unwrap(),
            vec![AttributeValue::string("alice")]
        );
    }

    #[test]
    fn bytes_are_rejected() {
        let split = RegexSplit::new("(.*)", true).unwrap();
        let mut map = AttributeMap::new();
        map.insert(
            "photo".into(),
            Attribute::new("photo").with_value(AttributeValue::bytes(vec![1u8])),
        );
        assert!(matches!(
            split.split(&map),
            Err(PluginError::UnsupportedValueType { .. })
        ));
    }

    #[test]
    fn pattern_needs_a_capture_group() {
        let split = RegexSplit::new(r".+@example\.org", true).unwrap();
        assert!(matches!(
            split.check_settings(&"uid".into(), 1),
            Err(ResolverConfigError::InvalidSetting { .. })
        ));
    }
}
