//! Declarative resolver configuration.
//!
//! ```toml
//! [[resolver.connectors]]
//! id = "people"
//! type = "directory"
//! backend = "ldap"
//! base_dn = "ou=people,dc=example,dc=org"
//! filter = "(uid=${principal})"
//! failover = "people-static"
//!
//! [[resolver.definitions]]
//! id = "mail"
//! type = "simple"
//! dependencies = [{ plugin = "people" }]
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use lanyard_resolver::{
    ActivationCondition, AttributeDefinition, AttributeResolver, AuthenticationMethodIn,
    DataConnector, DefinitionKind, Dependency, DirectoryConnector, EntryMapping, PluginSpec,
    QueryTemplate, RecipientIn, RegexSplit, RelationalConnector, ResolutionContext, RowMapping,
    ScriptedDefinition, StaticConnector,
};
use lanyard_types::{Attribute, EncoderDescriptor};
use serde::{Deserialize, Serialize};

use crate::{Backends, ConfigError};

/// The `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub id: String,
    pub connectors: Vec<ConnectorConfig>,
    pub definitions: Vec<DefinitionConfig>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            connectors: Vec::new(),
            definitions: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Builds and validates the resolver, wiring backends by name.
    pub fn build(&self, backends: &Backends) -> Result<AttributeResolver, ConfigError> {
        let mut builder = AttributeResolver::builder(&self.id);
        for connector in &self.connectors {
            builder = builder.with_connector(connector.build(backends)?);
        }
        for definition in &self.definitions {
            builder = builder.with_definition(definition.build(backends)?);
        }
        Ok(builder.build()?)
    }
}

// ============================================================================
// Shared plugin settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    pub plugin: String,
    /// Only meaningful for connector dependencies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_attribute: Option<String>,
}

impl From<&DependencyConfig> for Dependency {
    fn from(value: &DependencyConfig) -> Self {
        match &value.source_attribute {
            Some(attribute) => Dependency::source(value.plugin.as_str(), attribute.as_str()),
            None => Dependency::on(value.plugin.as_str()),
        }
    }
}

/// Restricts a plugin to some requests. Both lists must match when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub recipients: Vec<String>,
    pub authentication_methods: Vec<String>,
}

impl ActivationConfig {
    fn condition(&self) -> Option<Arc<dyn ActivationCondition>> {
        let recipients = (!self.recipients.is_empty()).then(|| RecipientIn(self.recipients.clone()));
        let methods = (!self.authentication_methods.is_empty())
            .then(|| AuthenticationMethodIn(self.authentication_methods.clone()));

        match (recipients, methods) {
            (None, None) => None,
            (Some(r), None) => Some(Arc::new(r)),
            (None, Some(m)) => Some(Arc::new(m)),
            (Some(r), Some(m)) => Some(Arc::new(move |ctx: &ResolutionContext| {
                r.is_active(ctx) && m.is_active(ctx)
            })),
        }
    }
}

fn plugin_spec(
    id: &str,
    dependencies: &[DependencyConfig],
    activation: Option<&ActivationConfig>,
) -> PluginSpec {
    let mut spec = PluginSpec::new(id).with_dependencies(dependencies.iter().map(Dependency::from));
    if let Some(condition) = activation.and_then(ActivationConfig::condition) {
        spec = spec.with_shared_activation(condition);
    }
    spec
}

fn template(plugin: &str, source: &str) -> Result<QueryTemplate, ConfigError> {
    QueryTemplate::parse(source).map_err(|source| ConfigError::TemplateError {
        plugin: plugin.to_string(),
        source,
    })
}

// ============================================================================
// Connectors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivationConfig>,
    /// Connector to use when this one fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover: Option<String>,
    /// Treat an empty result as a failure.
    #[serde(default)]
    pub no_result_is_error: bool,
    #[serde(flatten)]
    pub source: ConnectorSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAttributeConfig {
    pub id: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConnectorSource {
    Static {
        attributes: Vec<StaticAttributeConfig>,
    },
    Directory {
        backend: String,
        base_dn: String,
        filter: String,
        #[serde(default)]
        return_attributes: Vec<String>,
        #[serde(default)]
        mapping: Vec<RenameConfig>,
        #[serde(default)]
        binary_attributes: Vec<String>,
        #[serde(default)]
        multiple_results_allowed: bool,
    },
    Relational {
        backend: String,
        query: String,
        #[serde(default)]
        mapping: Vec<RenameConfig>,
        #[serde(default)]
        lowercase_columns: bool,
    },
}

impl ConnectorConfig {
    pub fn build(&self, backends: &Backends) -> Result<DataConnector, ConfigError> {
        let spec = plugin_spec(&self.id, &self.dependencies, self.activation.as_ref());

        let connector = match &self.source {
            ConnectorSource::Static { attributes } => {
                let fixed = attributes.iter().fold(StaticConnector::new(), |acc, a| {
                    acc.with_attribute(Attribute::new(&a.id).with_values(a.values.iter().cloned()))
                });
                DataConnector::fixed(spec, fixed)
            }
            ConnectorSource::Directory {
                backend,
                base_dn,
                filter,
                return_attributes,
                mapping,
                binary_attributes,
                multiple_results_allowed,
            } => {
                let client = backends.directory(&self.id, backend)?;
                let mut entry_mapping =
                    EntryMapping::new().with_multiple_results_allowed(*multiple_results_allowed);
                for rename in mapping {
                    entry_mapping = entry_mapping.with_rename(&rename.from, &rename.to);
                }
                for name in binary_attributes {
                    entry_mapping = entry_mapping.with_binary_attribute(name);
                }
                let directory =
                    DirectoryConnector::new(client, base_dn, template(&self.id, filter)?)
                        .with_return_attributes(return_attributes.iter().cloned())
                        .with_mapping(entry_mapping);
                DataConnector::directory(spec, directory)
            }
            ConnectorSource::Relational {
                backend,
                query,
                mapping,
                lowercase_columns,
            } => {
                let client = backends.database(&self.id, backend)?;
                let mut row_mapping = RowMapping::new().with_lowercase_columns(*lowercase_columns);
                for rename in mapping {
                    row_mapping = row_mapping.with_rename(&rename.from, &rename.to);
                }
                let relational = RelationalConnector::new(client, template(&self.id, query)?)
                    .with_mapping(row_mapping);
                DataConnector::relational(spec, relational)
            }
        };

        let mut connector = connector.with_no_result_is_error(self.no_result_is_error);
        if let Some(failover) = &self.failover {
            connector = connector.with_failover(failover.as_str());
        }
        Ok(connector)
    }
}

// ============================================================================
// Definitions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivationConfig>,
    /// Computed for other plugins but never released.
    #[serde(default)]
    pub dependency_only: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub display_names: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub display_descriptions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encoders: Vec<EncoderDescriptor>,
    #[serde(flatten)]
    pub kind: DefinitionSource,
}

fn default_case_sensitive() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DefinitionSource {
    Simple,
    Scoped {
        scope: String,
    },
    RegexSplit {
        pattern: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    Scripted {
        engine: String,
        script: String,
    },
    PrincipalAuthenticationMethod,
}

impl DefinitionConfig {
    pub fn build(&self, backends: &Backends) -> Result<AttributeDefinition, ConfigError> {
        let spec = plugin_spec(&self.id, &self.dependencies, self.activation.as_ref());

        let kind = match &self.kind {
            DefinitionSource::Simple => DefinitionKind::Simple,
            DefinitionSource::Scoped { scope } => DefinitionKind::Scoped {
                scope: scope.clone(),
            },
            DefinitionSource::RegexSplit {
                pattern,
                case_sensitive,
            } => DefinitionKind::RegexSplit(RegexSplit::new(pattern, *case_sensitive).map_err(
                |source| ConfigError::PatternError {
                    plugin: self.id.clone(),
                    pattern: pattern.clone(),
                    source,
                },
            )?),
            DefinitionSource::Scripted { engine, script } => {
                let evaluator = backends.script_engine(&self.id, engine)?;
                DefinitionKind::Scripted(ScriptedDefinition::new(evaluator, script))
            }
            DefinitionSource::PrincipalAuthenticationMethod => {
                DefinitionKind::PrincipalAuthenticationMethod
            }
        };

        let mut definition =
            AttributeDefinition::new(spec, kind).with_dependency_only(self.dependency_only);
        for (locale, name) in &self.display_names {
            definition = definition.with_display_name(locale, name);
        }
        for (locale, description) in &self.display_descriptions {
            definition = definition.with_display_description(locale, description);
        }
        for encoder in &self.encoders {
            definition = definition.with_encoder(encoder.clone());
        }
        Ok(definition)
    }
}
