//! Attribute definitions: plugins that derive one attribute from their
//! dependencies.
//!
//! A definition never talks to a backend directly (scripted definitions go
//! through the injected [`ScriptEvaluator`](crate::ScriptEvaluator)). It
//! sees only the merged attributes its dependencies produced, plus the
//! request metadata in the [`ResolutionContext`].

mod regex_split;
mod scripted;

pub use regex_split::RegexSplit;
pub use scripted::ScriptedDefinition;

use lanyard_types::{
    Attribute, AttributeMap, AttributeValue, EncoderDescriptor, LocalizedStrings, PluginId,
};
use tracing::debug;

use crate::context::ResolutionContext;
use crate::error::{PluginError, ResolverConfigError};
use crate::plugin::{PluginSpec, ResolverPlugin};

/// How a definition computes its values.
#[derive(Debug)]
pub enum DefinitionKind {
    /// Passes every dependency value through.
    Simple,
    /// Wraps string dependency values into scoped values.
    Scoped { scope: String },
    /// First capture group of each fully matching dependency value.
    RegexSplit(RegexSplit),
    /// Values produced by a script.
    Scripted(ScriptedDefinition),
    /// The principal's authentication method from the request.
    PrincipalAuthenticationMethod,
}

impl DefinitionKind {
    pub fn name(&self) -> &'static str {
        match self {
            DefinitionKind::Simple => "simple",
            DefinitionKind::Scoped { .. } => "scoped",
            DefinitionKind::RegexSplit(_) => "regex-split",
            DefinitionKind::Scripted(_) => "scripted",
            DefinitionKind::PrincipalAuthenticationMethod => "principal-authentication-method",
        }
    }
}

/// A resolver plugin computing one attribute.
///
/// The attribute id is the plugin id.
#[derive(Debug)]
pub struct AttributeDefinition {
    spec: PluginSpec,
    kind: DefinitionKind,
    dependency_only: bool,
    display_names: LocalizedStrings,
    display_descriptions: LocalizedStrings,
    encoders: Vec<EncoderDescriptor>,
}

impl AttributeDefinition {
    pub fn new(spec: PluginSpec, kind: DefinitionKind) -> Self {
        Self {
            spec,
            kind,
            dependency_only: false,
            display_names: LocalizedStrings::new(),
            display_descriptions: LocalizedStrings::new(),
            encoders: Vec::new(),
        }
    }

    /// Computes values for dependents only; never released.
    pub fn with_dependency_only(mut self, dependency_only: bool) -> Self {
        self.dependency_only = dependency_only;
        self
    }

    pub fn with_display_name(mut self, locale: impl Into<String>, name: impl Into<String>) -> Self {
        self.display_names.insert(locale.into(), name.into());
        self
    }

    pub fn with_display_description(
        mut self,
        locale: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.display_descriptions
            .insert(locale.into(), description.into());
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderDescriptor) -> Self {
        self.encoders.push(encoder);
        self
    }

    pub fn kind(&self) -> &DefinitionKind {
        &self.kind
    }

    pub fn is_dependency_only(&self) -> bool {
        self.dependency_only
    }

    /// Computes the attribute from merged dependency attributes.
    ///
    /// Returns `Ok(None)` when no values were produced.
    pub fn compute(
        &self,
        context: &ResolutionContext,
        dependencies: &AttributeMap,
    ) -> Result<Option<Attribute>, PluginError> {
        let values: Vec<AttributeValue> = match &self.kind {
            DefinitionKind::Simple => dependencies
                .values()
                .flat_map(|attribute| attribute.values().iter().cloned())
                .collect(),
            DefinitionKind::Scoped { scope } => scope_values(dependencies, scope)?,
            DefinitionKind::RegexSplit(split) => split.split(dependencies)?,
            DefinitionKind::Scripted(script) => script.run(self.spec.id(), context, dependencies)?,
            DefinitionKind::PrincipalAuthenticationMethod => context
                .authentication_method()
                .map(AttributeValue::string)
                .into_iter()
                .collect(),
        };

        debug!(
            plugin = %self.spec.id(),
            kind = self.kind.name(),
            values = values.len(),
            "attribute definition computed"
        );

        if values.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            Attribute::new(self.spec.id().as_str())
                .with_values(values)
                .with_display_names(self.display_names.clone())
                .with_display_descriptions(self.display_descriptions.clone())
                .with_encoders(self.encoders.clone()),
        ))
    }

    fn require_dependency(&self) -> Result<(), ResolverConfigError> {
        if self.spec.dependencies().is_empty() {
            return Err(ResolverConfigError::MissingSetting {
                plugin: self.spec.id().clone(),
                setting: "dependency",
            });
        }
        Ok(())
    }
}

fn scope_values(dependencies: &AttributeMap, scope: &str) -> Result<Vec<AttributeValue>, PluginError> {
    dependencies
        .values()
        .flat_map(|attribute| attribute.values())
        .map(|value| match value {
            AttributeValue::String(s) => Ok(AttributeValue::scoped(s.clone(), scope)),
            other => Err(PluginError::UnsupportedValueType {
                expected: "string",
                actual: other.kind(),
            }),
        })
        .collect()
}

impl ResolverPlugin for AttributeDefinition {
    fn spec(&self) -> &PluginSpec {
        &self.spec
    }

    fn check_settings(&self) -> Result<(), ResolverConfigError> {
        let id: &PluginId = self.spec.id();
        match &self.kind {
            DefinitionKind::Simple => self.require_dependency(),
            DefinitionKind::Scoped { scope } => {
                if scope.trim().is_empty() {
                    return Err(ResolverConfigError::MissingSetting {
                        plugin: id.clone(),
                        setting: "scope",
                    });
                }
                self.require_dependency()
            }
            DefinitionKind::RegexSplit(split) => {
                split.check_settings(id, self.spec.dependencies().len())
            }
            DefinitionKind::Scripted(script) => script.check_settings(id),
            DefinitionKind::PrincipalAuthenticationMethod => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Dependency;

    fn deps(id: &str, values: Vec<AttributeValue>) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert(id.into(), Attribute::new(id).with_values(values));
        map
    }

    #[test]
    fn definition_attaches_metadata() {
        let definition = AttributeDefinition::new(
            PluginSpec::new("mail").with_dependency(Dependency::on("ldap")),
            DefinitionKind::Simple,
        )
        .with_display_name("en", "Email")
        .with_encoder(EncoderDescriptor::new("saml2", "urn:oid:0.9.2342.19200300.100.1.3"));

        let attribute = definition
            .compute(
                &ResolutionContext::new("alice"),
                &deps("mail", vec![AttributeValue::string("alice@example.org")]),
            )
            .unwrap()
            .unwrap();

        assert_eq!(attribute.id(), "mail");
        assert_eq!(attribute.display_names()["en"], "Email");
        assert_eq!(attribute.encoders().len(), 1);
    }

    #[test]
    fn scoped_definition_rejects_non_strings() {
        let definition = AttributeDefinition::new(
            PluginSpec::new("eppn").with_dependency(Dependency::on("uid")),
            DefinitionKind::Scoped {
                scope: "example.org".into(),
            },
        );

        let ok = definition
            .compute(
                &ResolutionContext::new("alice"),
                &deps("uid", vec![AttributeValue::string("alice")]),
            )
            .unwrap()
            .unwrap();
        assert_eq!(ok.values(), &[AttributeValue::scoped("alice", "example.org")]);

        let err = definition
            .compute(
                &ResolutionContext::new("alice"),
                &deps("uid", vec![AttributeValue::bytes(vec![1u8])]),
            )
            .unwrap_err();
        assert!(matches!(err, PluginError::UnsupportedValueType { .. }));
    }

    #[test]
    fn authentication_method_comes_from_context() {
        let definition = AttributeDefinition::new(
            PluginSpec::new("authnMethod"),
            DefinitionKind::PrincipalAuthenticationMethod,
        );
        assert!(definition.check_settings().is_ok());

        let ctx = ResolutionContext::new("alice").with_authentication_method("password");
        let attribute = definition.compute(&ctx, &AttributeMap::new()).unwrap().unwrap();
        assert_eq!(attribute.values(), &[AttributeValue::string("password")]);

        let none = definition
            .compute(&ResolutionContext::new("alice"), &AttributeMap::new())
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn simple_definition_requires_a_dependency() {
        let definition = AttributeDefinition::new(PluginSpec::new("mail"), DefinitionKind::Simple);
        assert!(matches!(
            definition.check_settings(),
            Err(ResolverConfigError::MissingSetting { setting: "dependency", .. })
        ));
    }
}
