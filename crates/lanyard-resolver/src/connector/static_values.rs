use lanyard_types::{Attribute, AttributeMap, PluginId};

use crate::error::ResolverConfigError;

/// Returns the same attributes for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticConnector {
    attributes: AttributeMap,
}

impl StaticConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.insert(attribute.id().to_string(), attribute);
        self
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub(super) fn fetch(&self) -> AttributeMap {
        self.attributes.clone()
    }

    pub(super) fn check_settings(&self, plugin: &PluginId) -> Result<(), ResolverConfigError> {
        if self.attributes.values().all(Attribute::is_empty) {
            return Err(ResolverConfigError::MissingSetting {
                plugin: plugin.clone(),
                setting: "static value",
            });
        }
        Ok(())
    }
}
