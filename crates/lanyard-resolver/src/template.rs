//! Query templates with `${name}` placeholders.
//!
//! Reserved names come from the resolution context:
//!
//! | placeholder       | value                              |
//! |-------------------|------------------------------------|
//! | `${principal}`    | principal name                     |
//! | `${issuer}`       | issuing entity id                  |
//! | `${recipient}`    | relying party entity id            |
//! | `${authn_method}` | principal authentication method    |
//!
//! Any other name refers to a dependency attribute id and renders that
//! attribute's first value. Templates are parsed once at build time and
//! rendered per request.

use lanyard_types::AttributeMap;
use thiserror::Error;

use crate::backend::SqlValue;
use crate::context::ResolutionContext;
use crate::error::PluginError;

/// A malformed template, detected at build time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),

    #[error("empty placeholder at byte {0}")]
    EmptyName(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed query template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl QueryTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("${") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or(TemplateError::Unterminated(offset + start))?;
            let name = after[..end].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyName(offset + start));
            }
            segments.push(Segment::Param(name.to_string()));

            let consumed = start + 2 + end + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder, passing each value through `escape`.
    pub fn render(
        &self,
        vars: &TemplateVars<'_>,
        escape: impl Fn(&str) -> String,
    ) -> Result<String, PluginError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) => out.push_str(&escape(&vars.lookup(name)?)),
            }
        }
        Ok(out)
    }

    /// Replaces each placeholder with `?` and returns the bind values in order.
    pub fn render_parameterized(
        &self,
        vars: &TemplateVars<'_>,
    ) -> Result<(String, Vec<SqlValue>), PluginError> {
        let mut sql = String::with_capacity(self.source.len());
        let mut params = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => sql.push_str(text),
                Segment::Param(name) => {
                    sql.push('?');
                    params.push(SqlValue::Text(vars.lookup(name)?));
                }
            }
        }
        Ok((sql, params))
    }
}

/// Values available to a template for one request.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    context: &'a ResolutionContext,
    attributes: &'a AttributeMap,
}

impl<'a> TemplateVars<'a> {
    pub fn new(context: &'a ResolutionContext, attributes: &'a AttributeMap) -> Self {
        Self {
            context,
            attributes,
        }
    }

    fn lookup(&self, name: &str) -> Result<String, PluginError> {
        let reserved = match name {
            "principal" => Some(self.context.principal()),
            "issuer" => Some(self.context.issuer()),
            "recipient" => Some(self.context.recipient()),
            "authn_method" => Some(self.context.authentication_method()),
            _ => None,
        };
        if let Some(value) = reserved {
            return value
                .map(str::to_string)
                .ok_or_else(|| PluginError::MissingTemplateValue(name.to_string()));
        }

        let value = self
            .attributes
            .get(name)
            .and_then(|attribute| attribute.values().first())
            .ok_or_else(|| PluginError::MissingTemplateValue(name.to_string()))?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or(PluginError::UnsupportedValueType {
                expected: "string",
                actual: value.kind(),
            })
    }
}

/// Escapes a value for use inside an LDAP search filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanyard_types::{Attribute, AttributeValue};
    use proptest::prelude::*;
    use test_case::test_case;

    fn vars_for<'a>(ctx: &'a ResolutionContext, attrs: &'a AttributeMap) -> TemplateVars<'a> {
        TemplateVars::new(ctx, attrs)
    }

    #[test]
    fn renders_reserved_and_attribute_placeholders() {
        let template = QueryTemplate::parse("(&(uid=${principal})(o=${org}))").unwrap();
        let ctx = ResolutionContext::new("alice");
        let mut attrs = AttributeMap::new();
        attrs.insert("org".into(), Attribute::new("org").with_value("Example"));

        let filter = template
            .render(&vars_for(&ctx, &attrs), escape_filter_value)
            .unwrap();

        assert_eq!(filter, "(&(uid=alice)(o=Example))");
    }

    #[test]
    fn missing_value_is_a_plugin_error() {
        let template = QueryTemplate::parse("uid=${recipient}").unwrap();
        let ctx = ResolutionContext::new("alice");
        let attrs = AttributeMap::new();

        let err = template
            .render(&vars_for(&ctx, &attrs), escape_filter_value)
            .unwrap_err();

        assert!(matches!(err, PluginError::MissingTemplateValue(name) if name == "recipient"));
    }

    #[test]
    fn binary_attribute_cannot_be_rendered() {
        let template = QueryTemplate::parse("${photo}").unwrap();
        let ctx = ResolutionContext::new("alice");
        let mut attrs = AttributeMap::new();
        attrs.insert(
            "photo".into(),
            Attribute::new("photo").with_value(AttributeValue::bytes(vec![0u8, 1])),
        );

        let err = template.render(&vars_for(&ctx, &attrs), str::to_string).unwrap_err();
        assert!(matches!(err, PluginError::UnsupportedValueType { .. }));
    }

    #[test]
    fn parameterized_rendering_uses_binds() {
        let template =
            QueryTemplate::parse("SELECT mail FROM people WHERE uid = ${principal}").unwrap();
        let ctx = ResolutionContext::new("o'brien");
        let attrs = AttributeMap::new();

        let (sql, params) = template.render_parameterized(&vars_for(&ctx, &attrs)).unwrap();

        assert_eq!(sql, "SELECT mail FROM people WHERE uid = ?");
        assert_eq!(params, vec![SqlValue::Text("o'brien".into())]);
    }

    #[test_case("uid=${principal", TemplateError::Unterminated(4); "unterminated")]
    #[test_case("uid=${ }", TemplateError::EmptyName(4); "empty")]
    fn malformed_templates_are_rejected(source: &str, expected: TemplateError) {
        assert_eq!(QueryTemplate::parse(source).unwrap_err(), expected);
    }

    #[test_case("a*b", "a\\2ab")]
    #[test_case("(x)", "\\28x\\29")]
    #[test_case("back\\slash", "back\\5cslash")]
    #[test_case("nul\0", "nul\\00")]
    fn escapes_filter_metacharacters(input: &str, expected: &str) {
        assert_eq!(escape_filter_value(input), expected);
    }

    proptest! {
        /// Property: escaped values contain no unescaped filter metacharacters
        #[test]
        fn prop_escaped_values_are_inert(value in any::<String>()) {
            let escaped = escape_filter_value(&value);
            prop_assert!(!escaped.contains('*'));
            prop_assert!(!escaped.contains('('));
            prop_assert!(!escaped.contains(')'));
            prop_assert!(!escaped.contains('\0'));
            // every backslash starts a two-digit hex escape
            let bytes = escaped.as_bytes();
            for (i, b) in bytes.iter().enumerate() {
                if *b == b'\\' {
                    prop_assert!(i + 2 < bytes.len());
                    prop_assert!(bytes[i + 1].is_ascii_hexdigit());
                    prop_assert!(bytes[i + 2].is_ascii_hexdigit());
                }
            }
        }

        /// Property: templates without placeholders render to themselves
        #[test]
        fn prop_literal_templates_are_identity(text in "[a-zA-Z0-9=(),&| ]{0,40}") {
            let template = QueryTemplate::parse(&text).unwrap();
            let ctx = ResolutionContext::default();
            let attrs = AttributeMap::new();
            prop_assert_eq!(template.render(&TemplateVars::new(&ctx, &attrs), str::to_string).unwrap(), text);
        }
    }
}
