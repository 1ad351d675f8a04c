//! # lanyard-types: Core attribute data model for `Lanyard`
//!
//! This crate contains the shared types passed between the resolver and the
//! filter:
//! - Plugin identity ([`PluginId`])
//! - Values ([`AttributeValue`], [`ScopedValue`], [`ValueKind`])
//! - Attributes ([`Attribute`], [`AttributeMap`])
//! - Output encoding descriptors ([`EncoderDescriptor`])
//!
//! Values are immutable once constructed. An [`Attribute`] holds a set of
//! values (insertion ordered, never duplicated) plus optional display
//! metadata keyed by locale tag.

use std::{
    borrow::Borrow,
    collections::BTreeMap,
    fmt::{Debug, Display},
};

use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ============================================================================
// Plugin IDs
// ============================================================================

/// Identifier of a resolver plugin (data connector or attribute definition).
///
/// Unique within one resolver instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PluginId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PluginId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Attribute Values
// ============================================================================

/// A string value qualified by a security domain, e.g. `member@example.org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedValue {
    pub value: String,
    pub scope: String,
}

/// The runtime type of an [`AttributeValue`].
///
/// Used in diagnostics when a definition receives a value it cannot process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Scoped,
    Bytes,
    Structured,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Scoped => "scoped",
            ValueKind::Bytes => "bytes",
            ValueKind::Structured => "structured",
        };
        f.write_str(name)
    }
}

/// A single typed value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Plain string.
    String(String),
    /// String plus scope.
    Scoped(ScopedValue),
    /// Opaque byte sequence (binary directory attributes, hashes).
    Bytes(Bytes),
    /// Structured data the core never inspects.
    Structured(serde_json::Value),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn scoped(value: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::Scoped(ScopedValue {
            value: value.into(),
            scope: scope.into(),
        })
    }

    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Self::Bytes(value.into())
    }

    pub fn structured(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }

    /// Returns the runtime type of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::String(_) => ValueKind::String,
            AttributeValue::Scoped(_) => ValueKind::Scoped,
            AttributeValue::Bytes(_) => ValueKind::Bytes,
            AttributeValue::Structured(_) => ValueKind::Structured,
        }
    }

    /// Returns the textual part of string-like values.
    ///
    /// For scoped values this is the unscoped value. Byte and structured
    /// values have no textual form and return `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Scoped(scoped) => Some(&scoped.value),
            AttributeValue::Bytes(_) | AttributeValue::Structured(_) => None,
        }
    }

    /// Returns the scope of a scoped value.
    pub fn scope(&self) -> Option<&str> {
        match self {
            AttributeValue::Scoped(scoped) => Some(&scoped.scope),
            _ => None,
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Scoped(scoped) => write!(f, "{}@{}", scoped.value, scoped.scope),
            AttributeValue::Bytes(b) => {
                f.write_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            AttributeValue::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

// ============================================================================
// Encoders
// ============================================================================

/// Describes how an attribute is to be encoded by an outbound protocol layer.
///
/// The core never interprets descriptors; it only carries them from the
/// defining plugin to the released attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncoderDescriptor {
    /// Protocol family, e.g. "saml2" or "cas".
    pub protocol: String,
    /// Name the attribute is released under.
    pub name: String,
    /// Optional protocol-specific name format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_format: Option<String>,
    /// Optional human-friendly name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
}

impl EncoderDescriptor {
    pub fn new(protocol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            name: name.into(),
            name_format: None,
            friendly_name: None,
        }
    }

    pub fn with_name_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = Some(format.into());
        self
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// Attributes keyed by attribute id.
pub type AttributeMap = BTreeMap<String, Attribute>;

/// Localized strings keyed by locale tag (e.g. "en", "de-CH").
pub type LocalizedStrings = BTreeMap<String, String>;

/// A named, multi-valued attribute.
///
/// Values form a set: adding a value that is already present is a no-op.
/// Insertion order is kept only for stable output; it carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    id: String,
    values: Vec<AttributeValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    display_names: LocalizedStrings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    display_descriptions: LocalizedStrings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    encoders: Vec<EncoderDescriptor>,
}

impl Attribute {
    /// Creates an attribute with no values.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
            display_names: BTreeMap::new(),
            display_descriptions: BTreeMap::new(),
            encoders: Vec::new(),
        }
    }

    /// Adds a value (builder pattern).
    pub fn with_value(mut self, value: impl Into<AttributeValue>) -> Self {
        self.add_value(value.into());
        self
    }

    /// Adds several values (builder pattern).
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        for value in values {
            self.add_value(value.into());
        }
        self
    }

    /// Replaces the display names. Blank names are dropped, others trimmed.
    pub fn with_display_names(mut self, names: LocalizedStrings) -> Self {
        self.display_names = trimmed(names);
        self
    }

    /// Replaces the display descriptions. Blank entries are dropped.
    pub fn with_display_descriptions(mut self, descriptions: LocalizedStrings) -> Self {
        self.display_descriptions = trimmed(descriptions);
        self
    }

    /// Replaces the encoder descriptors.
    pub fn with_encoders(mut self, encoders: Vec<EncoderDescriptor>) -> Self {
        self.encoders = encoders;
        self
    }

    /// Adds a value unless an equal value is already present.
    ///
    /// Returns `true` if the value was added.
    pub fn add_value(&mut self, value: AttributeValue) -> bool {
        if self.values.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Keeps only the values for which `keep` returns `true`.
    pub fn retain_values(&mut self, mut keep: impl FnMut(&AttributeValue) -> bool) {
        self.values.retain(|v| keep(v));
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }

    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.contains(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn display_names(&self) -> &LocalizedStrings {
        &self.display_names
    }

    pub fn display_descriptions(&self) -> &LocalizedStrings {
        &self.display_descriptions
    }

    pub fn encoders(&self) -> &[EncoderDescriptor] {
        &self.encoders
    }
}

fn trimmed(entries: LocalizedStrings) -> LocalizedStrings {
    entries
        .into_iter()
        .filter_map(|(locale, text)| {
            let text = text.trim();
            (!text.is_empty()).then(|| (locale, text.to_string()))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn duplicate_values_are_ignored() {
        let mut attr = Attribute::new("mail").with_values(["a@example.org", "b@example.org"]);
        assert!(!attr.add_value(AttributeValue::string("a@example.org")));
        assert_eq!(attr.len(), 2);
    }

    #[test]
    fn scoped_and_plain_values_are_distinct() {
        let attr = Attribute::new("affiliation")
            .with_value(AttributeValue::string("member"))
            .with_value(AttributeValue::scoped("member", "example.org"));
        assert_eq!(attr.len(), 2);
    }

    #[test_case(AttributeValue::string("alice"), Some("alice"); "string")]
    #[test_case(AttributeValue::scoped("staff", "example.org"), Some("staff"); "scoped")]
    #[test_case(AttributeValue::bytes(vec![1u8, 2, 3]), None; "bytes")]
    #[test_case(AttributeValue::structured(serde_json::json!({"a": 1})), None; "structured")]
    fn as_str_exposes_textual_values(value: AttributeValue, expected: Option<&str>) {
        assert_eq!(value.as_str(), expected);
    }

    #[test]
    fn display_formats() {
        assert_eq!(
            AttributeValue::scoped("staff", "example.org").to_string(),
            "staff@example.org"
        );
        assert_eq!(AttributeValue::bytes(b"hi".to_vec()).to_string(), "aGk=");
    }

    #[test]
    fn blank_display_names_are_dropped() {
        let mut names = LocalizedStrings::new();
        names.insert("en".to_string(), "  Email  ".to_string());
        names.insert("de".to_string(), "   ".to_string());

        let attr = Attribute::new("mail").with_display_names(names);

        assert_eq!(attr.display_names().len(), 1);
        assert_eq!(attr.display_names().get("en").map(String::as_str), Some("Email"));
    }

    #[test]
    fn retain_values_filters_in_place() {
        let mut attr = Attribute::new("affiliation").with_values(["member", "staff", "student"]);
        attr.retain_values(|v| v.as_str() != Some("staff"));
        assert_eq!(
            attr.values(),
            &[AttributeValue::string("member"), AttributeValue::string("student")]
        );
    }

    #[test]
    fn value_serde_is_tagged() {
        let json = serde_json::to_string(&AttributeValue::scoped("a", "b")).unwrap();
        assert_eq!(json, r#"{"type":"scoped","value":{"value":"a","scope":"b"}}"#);
    }

    proptest! {
        /// Property: values never contain duplicates, whatever is added
        #[test]
        fn prop_values_are_a_set(values in proptest::collection::vec("[a-c]{1,2}", 0..20)) {
            let attr = Attribute::new("x").with_values(values.iter().map(String::as_str));
            for (i, a) in attr.values().iter().enumerate() {
                for b in &attr.values()[i + 1..] {
                    prop_assert_ne!(a, b);
                }
            }
            for v in &values {
                prop_assert!(attr.contains(&AttributeValue::string(v.clone())));
            }
        }
    }
}
