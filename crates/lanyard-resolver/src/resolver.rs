//! The attribute resolver: builds and walks the plugin dependency graph.

use std::collections::{BTreeMap, HashMap};

use lanyard_types::{AttributeMap, PluginId};
use tracing::{debug, info, warn};

use crate::connector::DataConnector;
use crate::context::{PluginOutput, ResolutionContext, WorkContext};
use crate::definition::AttributeDefinition;
use crate::error::{ResolutionError, ResolverConfigError, Result, ValidationError};
use crate::plugin::{Dependency, ResolverPlugin};

// ============================================================================
// Builder
// ============================================================================

/// Collects plugins and validates them into an [`AttributeResolver`].
#[derive(Debug)]
pub struct AttributeResolverBuilder {
    id: String,
    connectors: Vec<DataConnector>,
    definitions: Vec<AttributeDefinition>,
}

impl AttributeResolverBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connectors: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn with_connector(mut self, connector: DataConnector) -> Self {
        self.connectors.push(connector);
        self
    }

    pub fn with_definition(mut self, definition: AttributeDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Validates the plugin graph.
    ///
    /// Fails on duplicate ids, invalid plugin settings, dangling dependency
    /// or failover references, and cycles through dependencies or failover
    /// edges.
    pub fn build(self) -> std::result::Result<AttributeResolver, ResolverConfigError> {
        let mut connectors = BTreeMap::new();
        let mut definitions = BTreeMap::new();

        for connector in self.connectors {
            let id = connector.id().clone();
            if connectors.contains_key(&id) {
                return Err(ResolverConfigError::DuplicatePlugin(id));
            }
            connectors.insert(id, connector);
        }
        for definition in self.definitions {
            let id = definition.id().clone();
            if connectors.contains_key(&id) || definitions.contains_key(&id) {
                return Err(ResolverConfigError::DuplicatePlugin(id));
            }
            definitions.insert(id, definition);
        }

        let resolver = AttributeResolver {
            id: self.id,
            connectors,
            definitions,
        };

        for plugin in resolver.plugins() {
            plugin.check_settings()?;
        }
        resolver.check_references()?;
        resolver.check_acyclic()?;

        info!(
            resolver = %resolver.id,
            connectors = resolver.connectors.len(),
            definitions = resolver.definitions.len(),
            "attribute resolver built"
        );
        Ok(resolver)
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Immutable, validated plugin graph.
///
/// Safe to share across threads; all per-request state lives in the
/// caller's [`ResolutionContext`].
#[derive(Debug)]
pub struct AttributeResolver {
    id: String,
    connectors: BTreeMap<PluginId, DataConnector>,
    definitions: BTreeMap<PluginId, AttributeDefinition>,
}

impl AttributeResolver {
    pub fn builder(id: impl Into<String>) -> AttributeResolverBuilder {
        AttributeResolverBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connector(&self, id: &str) -> Option<&DataConnector> {
        self.connectors.get(id)
    }

    pub fn definition(&self, id: &str) -> Option<&AttributeDefinition> {
        self.definitions.get(id)
    }

    pub fn connector_ids(&self) -> impl Iterator<Item = &PluginId> {
        self.connectors.keys()
    }

    pub fn definition_ids(&self) -> impl Iterator<Item = &PluginId> {
        self.definitions.keys()
    }

    /// Resolves the requested attributes into `context`.
    ///
    /// On success the context's resolved map is replaced. On failure it is
    /// left untouched.
    pub fn resolve(&self, context: &mut ResolutionContext) -> Result<()> {
        let targets: Vec<&PluginId> = if context.requested_attributes().is_empty() {
            self.definitions.keys().collect()
        } else {
            context
                .requested_attributes()
                .iter()
                .filter_map(|name| match self.definitions.get_key_value(name.as_str()) {
                    Some((id, _)) => Some(id),
                    None => {
                        debug!(resolver = %self.id, attribute = %name, "no definition for requested attribute");
                        None
                    }
                })
                .collect()
        };

        let mut work = WorkContext::default();
        {
            let mut pass = ResolutionPass {
                resolver: self,
                context,
                work: &mut work,
            };
            for id in targets {
                pass.resolve_plugin(id)?;
            }
        }

        let mut released = AttributeMap::new();
        for (id, attribute) in work.definition_outputs() {
            let dependency_only = self
                .definitions
                .get(id)
                .is_some_and(AttributeDefinition::is_dependency_only);
            if dependency_only || attribute.is_empty() {
                continue;
            }
            released.insert(id.to_string(), attribute.clone());
        }

        info!(
            resolver = %self.id,
            plugins = work.len(),
            released = released.len(),
            "attribute resolution complete"
        );
        context.set_resolved_attributes(released);
        Ok(())
    }

    /// Checks every data connector's backend. Stops at the first failure.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        for (id, connector) in &self.connectors {
            connector.validate().map_err(|source| ValidationError {
                plugin: id.clone(),
                source,
            })?;
            debug!(plugin = %id, "data connector validated");
        }
        info!(resolver = %self.id, connectors = self.connectors.len(), "data connectors validated");
        Ok(())
    }

    fn plugins(&self) -> impl Iterator<Item = &dyn ResolverPlugin> {
        self.connectors
            .values()
            .map(|c| c as &dyn ResolverPlugin)
            .chain(self.definitions.values().map(|d| d as &dyn ResolverPlugin))
    }

    fn contains(&self, id: &PluginId) -> bool {
        self.connectors.contains_key(id) || self.definitions.contains_key(id)
    }

    fn check_references(&self) -> std::result::Result<(), ResolverConfigError> {
        for plugin in self.plugins() {
            for dependency in plugin.dependencies() {
                if !self.contains(dependency.plugin_id()) {
                    return Err(ResolverConfigError::MissingDependency {
                        plugin: plugin.id().clone(),
                        dependency: dependency.plugin_id().clone(),
                    });
                }
            }
        }

        for (id, connector) in &self.connectors {
            let Some(failover) = connector.failover() else {
                continue;
            };
            let reason = if failover == id {
                Some("a connector cannot fail over to itself")
            } else if self.definitions.contains_key(failover) {
                Some("failover must be a data connector")
            } else if !self.connectors.contains_key(failover) {
                Some("no such data connector")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ResolverConfigError::InvalidFailover {
                    plugin: id.clone(),
                    failover: failover.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Outgoing edges of a plugin: dependencies, then failover.
    fn edges(&self, id: &PluginId) -> Vec<&PluginId> {
        let mut edges: Vec<&PluginId> = Vec::new();
        if let Some(connector) = self.connectors.get(id) {
            edges.extend(connector.dependencies().iter().map(Dependency::plugin_id));
            edges.extend(connector.failover());
        } else if let Some(definition) = self.definitions.get(id) {
            edges.extend(definition.dependencies().iter().map(Dependency::plugin_id));
        }
        edges
    }

    /// Depth-first search with an explicit path for cycle reporting.
    fn check_acyclic(&self) -> std::result::Result<(), ResolverConfigError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            InProgress,
            Done,
        }

        fn visit<'a>(
            resolver: &'a AttributeResolver,
            id: &'a PluginId,
            marks: &mut HashMap<&'a PluginId, Mark>,
            path: &mut Vec<&'a PluginId>,
        ) -> std::result::Result<(), ResolverConfigError> {
            match marks.get(id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|p| *p == id).unwrap_or(0);
                    let mut cycle: Vec<PluginId> =
                        path[start..].iter().map(|p| (*p).clone()).collect();
                    cycle.push(id.clone());
                    return Err(ResolverConfigError::DependencyCycle { cycle });
                }
                None => {}
            }

            marks.insert(id, Mark::InProgress);
            path.push(id);
            for next in resolver.edges(id) {
                visit(resolver, next, marks, path)?;
            }
            path.pop();
            marks.insert(id, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        let mut path = Vec::new();
        for id in self.connectors.keys().chain(self.definitions.keys()) {
            visit(self, id, &mut marks, &mut path)?;
        }
        Ok(())
    }
}

// ============================================================================
// Resolution pass
// ============================================================================

/// One depth-first walk of the graph for a single request.
struct ResolutionPass<'a> {
    resolver: &'a AttributeResolver,
    context: &'a ResolutionContext,
    work: &'a mut WorkContext,
}

impl ResolutionPass<'_> {
    fn resolve_plugin(&mut self, id: &PluginId) -> Result<()> {
        if self.work.is_resolved(id) {
            return Ok(());
        }
        let resolver = self.resolver;
        if let Some(connector) = resolver.connectors.get(id) {
            self.resolve_connector(connector)
        } else if let Some(definition) = resolver.definitions.get(id) {
            self.resolve_definition(definition)
        } else {
            Ok(())
        }
    }

    fn resolve_dependencies(&mut self, dependencies: &[Dependency]) -> Result<()> {
        for dependency in dependencies {
            self.resolve_plugin(dependency.plugin_id())?;
        }
        Ok(())
    }

    fn resolve_definition(&mut self, definition: &AttributeDefinition) -> Result<()> {
        let id = definition.id();
        if !definition.is_active(self.context) {
            debug!(plugin = %id, "attribute definition inactive");
            self.work.record(id.clone(), PluginOutput::Inactive);
            return Ok(());
        }

        self.resolve_dependencies(definition.dependencies())?;
        let inputs = self.work.dependency_attributes(definition.dependencies());
        let attribute = definition
            .compute(self.context, &inputs)
            .map_err(|source| ResolutionError::Plugin {
                plugin: id.clone(),
                source,
            })?;
        self.work.record(id.clone(), PluginOutput::Definition(attribute));
        Ok(())
    }

    fn resolve_connector(&mut self, connector: &DataConnector) -> Result<()> {
        let id = connector.id();
        if !connector.is_active(self.context) {
            debug!(plugin = %id, "data connector inactive");
            self.work.record(id.clone(), PluginOutput::Inactive);
            return Ok(());
        }

        self.resolve_dependencies(connector.dependencies())?;
        let inputs = self.work.dependency_attributes(connector.dependencies());
        let primary = match connector.retrieve(self.context, &inputs) {
            Ok(attributes) => {
                self.work.record(
                    id.clone(),
                    PluginOutput::Connector(attributes.unwrap_or_default()),
                );
                return Ok(());
            }
            Err(e) => e,
        };

        let Some(failover) = connector.failover() else {
            return Err(ResolutionError::Plugin {
                plugin: id.clone(),
                source: primary,
            });
        };

        warn!(plugin = %id, failover = %failover, error = %primary, "data connector failed, using failover");
        if let Err(e) = self.resolve_plugin(failover) {
            return Err(ResolutionError::FailoverFailed {
                plugin: id.clone(),
                failover: failover.clone(),
                primary,
                source: Box::new(e),
            });
        }
        let substituted = self.work.connector_attributes(failover);
        self.work.record(id.clone(), PluginOutput::Connector(substituted));
        Ok(())
    }
}
