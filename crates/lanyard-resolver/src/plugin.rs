//! Shared plugin capability: identity, dependencies and activation.

use std::fmt::Debug;
use std::sync::Arc;

use lanyard_types::PluginId;
use serde::{Deserialize, Serialize};

use crate::context::ResolutionContext;
use crate::error::ResolverConfigError;

// ============================================================================
// Dependencies
// ============================================================================

/// A declared dependency on another plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    plugin: PluginId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_attribute: Option<String>,
}

impl Dependency {
    /// Depends on every attribute the plugin produces.
    pub fn on(plugin: impl Into<PluginId>) -> Self {
        Self {
            plugin: plugin.into(),
            source_attribute: None,
        }
    }

    /// Depends on one named attribute of a data connector.
    pub fn source(plugin: impl Into<PluginId>, attribute: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            source_attribute: Some(attribute.into()),
        }
    }

    pub fn plugin_id(&self) -> &PluginId {
        &self.plugin
    }

    pub fn source_attribute(&self) -> Option<&str> {
        self.source_attribute.as_deref()
    }
}

// ============================================================================
// Activation
// ============================================================================

/// Request predicate deciding whether a plugin runs at all.
///
/// An inactive plugin contributes nothing. Its dependents still run.
pub trait ActivationCondition: Send + Sync {
    fn is_active(&self, context: &ResolutionContext) -> bool;
}

impl<F> ActivationCondition for F
where
    F: Fn(&ResolutionContext) -> bool + Send + Sync,
{
    fn is_active(&self, context: &ResolutionContext) -> bool {
        self(context)
    }
}

/// Active only for the listed recipients.
#[derive(Debug, Clone, Default)]
pub struct RecipientIn(pub Vec<String>);

impl ActivationCondition for RecipientIn {
    fn is_active(&self, context: &ResolutionContext) -> bool {
        context
            .recipient()
            .is_some_and(|recipient| self.0.iter().any(|r| r == recipient))
    }
}

/// Active only for the listed authentication methods.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationMethodIn(pub Vec<String>);

impl ActivationCondition for AuthenticationMethodIn {
    fn is_active(&self, context: &ResolutionContext) -> bool {
        context
            .authentication_method()
            .is_some_and(|method| self.0.iter().any(|m| m == method))
    }
}

// ============================================================================
// Plugin spec
// ============================================================================

/// The parts every resolver plugin shares.
#[derive(Clone)]
pub struct PluginSpec {
    id: PluginId,
    dependencies: Vec<Dependency>,
    activation: Option<Arc<dyn ActivationCondition>>,
}

impl PluginSpec {
    pub fn new(id: impl Into<PluginId>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            activation: None,
        }
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn with_activation(mut self, condition: impl ActivationCondition + 'static) -> Self {
        self.activation = Some(Arc::new(condition));
        self
    }

    pub fn with_shared_activation(mut self, condition: Arc<dyn ActivationCondition>) -> Self {
        self.activation = Some(condition);
        self
    }

    pub fn id(&self) -> &PluginId {
        &self.id
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Plugins without an activation condition are always active.
    pub fn is_active(&self, context: &ResolutionContext) -> bool {
        self.activation
            .as_ref()
            .is_none_or(|condition| condition.is_active(context))
    }
}

impl Debug for PluginSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSpec")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("conditional", &self.activation.is_some())
            .finish()
    }
}

// ============================================================================
// Plugin capability
// ============================================================================

/// Capability shared by data connectors and attribute definitions.
pub trait ResolverPlugin: Send + Sync {
    fn spec(&self) -> &PluginSpec;

    /// Checks plugin-specific settings. Called once by the resolver builder.
    fn check_settings(&self) -> Result<(), ResolverConfigError>;

    fn id(&self) -> &PluginId {
        self.spec().id()
    }

    fn dependencies(&self) -> &[Dependency] {
        self.spec().dependencies()
    }

    fn is_active(&self, context: &ResolutionContext) -> bool {
        self.spec().is_active(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_plugins_are_active() {
        let spec = PluginSpec::new("static");
        assert!(spec.is_active(&ResolutionContext::new("alice")));
    }

    #[test]
    fn recipient_condition_requires_recipient() {
        let spec = PluginSpec::new("ldap")
            .with_activation(RecipientIn(vec!["https://sp.example.org".into()]));

        assert!(!spec.is_active(&ResolutionContext::new("alice")));
        assert!(spec.is_active(
            &ResolutionContext::new("alice").with_recipient("https://sp.example.org")
        ));
    }

    #[test]
    fn closures_are_conditions() {
        let spec = PluginSpec::new("x").with_activation(|ctx: &ResolutionContext| {
            ctx.principal() == Some("bob")
        });
        assert!(!spec.is_active(&ResolutionContext::new("alice")));
        assert!(spec.is_active(&ResolutionContext::new("bob")));
    }
}
