//! Party metadata: entity groups and entity attributes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A named group of entities, possibly nested in a parent group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<EntityGroup>>,
}

impl EntityGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: EntityGroup) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Builds a chain from innermost to outermost group.
    pub fn chain<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: DoubleEndedIterator,
        S: Into<String>,
    {
        names.into_iter().rev().fold(None, |parent, name| {
            let mut group = EntityGroup::new(name);
            group.parent = parent.map(Box::new);
            Some(group)
        })
    }

    /// Returns `true` if this group or any ancestor is named `name`.
    pub fn is_within(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(group) = current {
            if group.name == name {
                return true;
            }
            current = group.parent.as_deref();
        }
        false
    }
}

/// What metadata says about one party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDescriptor {
    pub entity_id: String,
    /// Innermost group containing the party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<EntityGroup>,
    /// Party-level entity attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl PartyDescriptor {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: EntityGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }
}

/// Source of party metadata.
pub trait PartyMetadataLookup: Send + Sync {
    /// Returns the descriptor for `entity_id`, or `None` if unknown.
    fn lookup(&self, entity_id: &str) -> Option<PartyDescriptor>;
}

/// In-memory metadata keyed by entity id.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    parties: HashMap<String, PartyDescriptor>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_party(mut self, descriptor: PartyDescriptor) -> Self {
        self.parties.insert(descriptor.entity_id.clone(), descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }
}

impl PartyMetadataLookup for StaticMetadata {
    fn lookup(&self, entity_id: &str) -> Option<PartyDescriptor> {
        self.parties.get(entity_id).cloned()
    }
}
