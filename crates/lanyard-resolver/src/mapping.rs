//! Mapping raw backend results into attributes.

use std::collections::{BTreeMap, BTreeSet};

use lanyard_types::{Attribute, AttributeMap, AttributeValue};

use crate::backend::{DirectoryEntry, RawValue, Row, SqlValue};
use crate::error::PluginError;

/// Strategy turning raw backend results of type `T` into attributes.
pub trait ResultMapping<T>: Send + Sync {
    fn map(&self, results: &[T]) -> Result<AttributeMap, PluginError>;
}

fn push_value(map: &mut AttributeMap, id: &str, value: AttributeValue) {
    map.entry(id.to_string())
        .or_insert_with(|| Attribute::new(id))
        .add_value(value);
}

// ============================================================================
// Directory entries
// ============================================================================

/// Maps directory entries one attribute per entry attribute name.
#[derive(Debug, Clone, Default)]
pub struct EntryMapping {
    renames: BTreeMap<String, String>,
    binary_attributes: BTreeSet<String>,
    multiple_results_allowed: bool,
}

impl EntryMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes directory attribute `from` under id `to`.
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    /// Treats values of `name` as opaque bytes.
    pub fn with_binary_attribute(mut self, name: impl Into<String>) -> Self {
        self.binary_attributes.insert(name.into());
        self
    }

    /// Merges values when a search returns more than one entry.
    pub fn with_multiple_results_allowed(mut self, allowed: bool) -> Self {
        self.multiple_results_allowed = allowed;
        self
    }
}

impl ResultMapping<DirectoryEntry> for EntryMapping {
    fn map(&self, entries: &[DirectoryEntry]) -> Result<AttributeMap, PluginError> {
        if entries.len() > 1 && !self.multiple_results_allowed {
            return Err(PluginError::Mapping(format!(
                "search returned {} entries, expected at most one",
                entries.len()
            )));
        }

        let mut map = AttributeMap::new();
        for entry in entries {
            for (name, values) in &entry.attributes {
                let id = self.renames.get(name).unwrap_or(name);
                let binary = self.binary_attributes.contains(name);
                for raw in values {
                    let value = match (raw, binary) {
                        (RawValue::Text(text), false) => AttributeValue::string(text.clone()),
                        (RawValue::Text(text), true) => {
                            AttributeValue::bytes(text.clone().into_bytes())
                        }
                        (RawValue::Binary(bytes), true) => AttributeValue::Bytes(bytes.clone()),
                        (RawValue::Binary(bytes), false) => match std::str::from_utf8(bytes) {
                            Ok(text) => AttributeValue::string(text),
                            Err(_) => AttributeValue::Bytes(bytes.clone()),
                        },
                    };
                    push_value(&mut map, id, value);
                }
            }
        }
        Ok(map)
    }
}

// ============================================================================
// Relational rows
// ============================================================================

/// Maps result rows one attribute per column.
#[derive(Debug, Clone, Default)]
pub struct RowMapping {
    renames: BTreeMap<String, String>,
    lowercase_columns: bool,
}

impl RowMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes column `from` under id `to`. Applied after lower-casing.
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn with_lowercase_columns(mut self, lowercase: bool) -> Self {
        self.lowercase_columns = lowercase;
        self
    }

    fn attribute_id(&self, column: &str) -> String {
        let column = if self.lowercase_columns {
            column.to_lowercase()
        } else {
            column.to_string()
        };
        self.renames.get(&column).cloned().unwrap_or(column)
    }
}

impl ResultMapping<Row> for RowMapping {
    fn map(&self, rows: &[Row]) -> Result<AttributeMap, PluginError> {
        let mut map = AttributeMap::new();
        for row in rows {
            for (column, value) in row {
                let value = match value {
                    SqlValue::Null => continue,
                    SqlValue::Text(text) => AttributeValue::string(text.clone()),
                    SqlValue::Integer(n) => AttributeValue::string(n.to_string()),
                    SqlValue::Binary(bytes) => AttributeValue::Bytes(bytes.clone()),
                };
                push_value(&mut map, &self.attribute_id(column), value);
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_mapping_renames_and_keeps_binary() {
        let entry = DirectoryEntry::new("uid=alice,ou=people,dc=example,dc=org")
            .with_attribute("mail", ["alice@example.org"])
            .with_attribute("jpegPhoto", [RawValue::Binary(vec![0xffu8, 0xd8].into())]);
        let mapping = EntryMapping::new()
            .with_rename("mail", "email")
            .with_binary_attribute("jpegPhoto");

        let map = mapping.map(&[entry]).unwrap();

        assert_eq!(map["email"].values(), &[AttributeValue::string("alice@example.org")]);
        assert_eq!(map["jpegPhoto"].values()[0].kind(), lanyard_types::ValueKind::Bytes);
    }

    #[test]
    fn multiple_entries_rejected_by_default() {
        let entries = vec![DirectoryEntry::new("a"), DirectoryEntry::new("b")];
        assert!(matches!(
            EntryMapping::new().map(&entries),
            Err(PluginError::Mapping(_))
        ));
        assert!(EntryMapping::new()
            .with_multiple_results_allowed(true)
            .map(&entries)
            .is_ok());
    }

    #[test]
    fn row_mapping_skips_nulls_and_lowercases() {
        let mut first = Row::new();
        first.insert("MAIL".into(), SqlValue::from("a@example.org"));
        first.insert("PHONE".into(), SqlValue::Null);
        let mut second = Row::new();
        second.insert("MAIL".into(), SqlValue::from("b@example.org"));
        second.insert("AGE".into(), SqlValue::from(42));

        let map = RowMapping::new()
            .with_lowercase_columns(true)
            .with_rename("age", "years")
            .map(&[first, second])
            .unwrap();

        assert_eq!(map["mail"].len(), 2);
        assert!(!map.contains_key("phone"));
        assert_eq!(map["years"].values(), &[AttributeValue::string("42")]);
    }
}
