//! Per-request resolution state.
//!
//! A [`ResolutionContext`] is owned by the caller and must not be shared
//! between concurrent requests. The [`WorkContext`] memo lives only for the
//! duration of one [`AttributeResolver::resolve`](crate::AttributeResolver::resolve)
//! call and is dropped when it returns.

use std::collections::{BTreeSet, HashMap};

use lanyard_types::{Attribute, AttributeMap, PluginId};

use crate::plugin::Dependency;

// ============================================================================
// Resolution Context
// ============================================================================

/// Input and output of one resolution pass.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    requested_attributes: BTreeSet<String>,
    principal: Option<String>,
    issuer: Option<String>,
    recipient: Option<String>,
    authentication_method: Option<String>,
    allow_cached_results: bool,
    resolved: AttributeMap,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self {
            requested_attributes: BTreeSet::new(),
            principal: None,
            issuer: None,
            recipient: None,
            authentication_method: None,
            allow_cached_results: true,
            resolved: AttributeMap::new(),
        }
    }
}

impl ResolutionContext {
    /// Creates a context for the given principal.
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            ..Self::default()
        }
    }

    /// Restricts resolution to the named attributes (builder pattern).
    ///
    /// An empty set means "resolve every attribute definition".
    pub fn with_requested_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the entity id of the party issuing the attributes.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the entity id of the relying party receiving the attributes.
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Sets the method the principal authenticated with.
    pub fn with_authentication_method(mut self, method: impl Into<String>) -> Self {
        self.authentication_method = Some(method.into());
        self
    }

    /// Sets whether backends may answer from their own caches.
    pub fn with_allow_cached_results(mut self, allow: bool) -> Self {
        self.allow_cached_results = allow;
        self
    }

    pub fn requested_attributes(&self) -> &BTreeSet<String> {
        &self.requested_attributes
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    pub fn authentication_method(&self) -> Option<&str> {
        self.authentication_method.as_deref()
    }

    pub fn allow_cached_results(&self) -> bool {
        self.allow_cached_results
    }

    /// Attributes released by the last successful resolution.
    pub fn resolved_attributes(&self) -> &AttributeMap {
        &self.resolved
    }

    /// Moves the resolved attributes out of the context.
    pub fn take_resolved_attributes(&mut self) -> AttributeMap {
        std::mem::take(&mut self.resolved)
    }

    pub(crate) fn set_resolved_attributes(&mut self, resolved: AttributeMap) {
        self.resolved = resolved;
    }
}

// ============================================================================
// Work Context
// ============================================================================

/// Memoized output of one plugin within a pass.
#[derive(Debug, Clone)]
pub(crate) enum PluginOutput {
    /// The activation condition was false.
    Inactive,
    /// Output of an attribute definition. `None` when nothing was produced.
    Definition(Option<Attribute>),
    /// Output of a data connector (possibly supplied by its failover).
    Connector(AttributeMap),
}

/// Per-pass memo of plugin outputs, keyed by plugin id.
#[derive(Debug, Default)]
pub struct WorkContext {
    outputs: HashMap<PluginId, PluginOutput>,
}

impl WorkContext {
    /// Returns `true` once the plugin has been evaluated in this pass.
    pub fn is_resolved(&self, id: &PluginId) -> bool {
        self.outputs.contains_key(id)
    }

    /// Number of plugins evaluated so far.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub(crate) fn record(&mut self, id: PluginId, output: PluginOutput) {
        self.outputs.insert(id, output);
    }

    /// Attributes produced by a connector; empty if inactive or unknown.
    pub(crate) fn connector_attributes(&self, id: &PluginId) -> AttributeMap {
        match self.outputs.get(id) {
            Some(PluginOutput::Connector(attributes)) => attributes.clone(),
            _ => AttributeMap::new(),
        }
    }

    /// Resolved definition attributes in this pass.
    pub(crate) fn definition_outputs(&self) -> impl Iterator<Item = (&PluginId, &Attribute)> {
        self.outputs.iter().filter_map(|(id, output)| match output {
            PluginOutput::Definition(Some(attribute)) => Some((id, attribute)),
            _ => None,
        })
    }

    /// Collects the attributes a plugin's dependencies made visible.
    ///
    /// A definition dependency contributes its attribute. A connector
    /// dependency contributes the named source attribute, or every
    /// attribute it produced when no source attribute is named. Values of
    /// attributes with the same id are merged.
    pub(crate) fn dependency_attributes(&self, dependencies: &[Dependency]) -> AttributeMap {
        let mut visible = AttributeMap::new();
        for dependency in dependencies {
            match self.outputs.get(dependency.plugin_id()) {
                Some(PluginOutput::Definition(Some(attribute))) => {
                    merge_into(&mut visible, attribute);
                }
                Some(PluginOutput::Connector(attributes)) => match dependency.source_attribute() {
                    Some(name) => {
                        if let Some(attribute) = attributes.get(name) {
                            merge_into(&mut visible, attribute);
                        }
                    }
                    None => {
                        for attribute in attributes.values() {
                            merge_into(&mut visible, attribute);
                        }
                    }
                },
                Some(PluginOutput::Inactive | PluginOutput::Definition(None)) | None => {}
            }
        }
        visible
    }
}

fn merge_into(visible: &mut AttributeMap, attribute: &Attribute) {
    match visible.get_mut(attribute.id()) {
        Some(existing) => {
            for value in attribute.values() {
                existing.add_value(value.clone());
            }
        }
        None => {
            visible.insert(
                attribute.id().to_string(),
                Attribute::new(attribute.id()).with_values(attribute.values().iter().cloned()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_defaults_allow_cached_results() {
        let ctx = ResolutionContext::new("alice");
        assert!(ctx.allow_cached_results());
        assert_eq!(ctx.principal(), Some("alice"));
        assert!(ctx.requested_attributes().is_empty());
    }

    #[test]
    fn dependency_attributes_merge_same_id() {
        let mut work = WorkContext::default();
        let mut from_a = AttributeMap::new();
        from_a.insert("mail".into(), Attribute::new("mail").with_value("a@x.org"));
        let mut from_b = AttributeMap::new();
        from_b.insert("mail".into(), Attribute::new("mail").with_value("b@x.org"));
        from_b.insert("cn".into(), Attribute::new("cn").with_value("Bob"));
        work.record("a".into(), PluginOutput::Connector(from_a));
        work.record("b".into(), PluginOutput::Connector(from_b));

        let visible = work.dependency_attributes(&[
            Dependency::on("a"),
            Dependency::source("b", "mail"),
        ]);

        assert_eq!(visible.len(), 1);
        assert_eq!(visible["mail"].len(), 2);
    }

    #[test]
    fn inactive_dependencies_contribute_nothing() {
        let mut work = WorkContext::default();
        work.record("a".into(), PluginOutput::Inactive);
        assert!(work.dependency_attributes(&[Dependency::on("a")]).is_empty());
    }
}
