use std::fmt::Debug;
use std::sync::Arc;

use lanyard_types::{AttributeMap, AttributeValue, PluginId};

use crate::backend::{ScriptBindings, ScriptEvaluator};
use crate::context::ResolutionContext;
use crate::error::{PluginError, ResolverConfigError};

/// Computes values by running a script.
///
/// Dependency attributes are bound by attribute id; the output is read from
/// the binding named after the definition itself.
pub struct ScriptedDefinition {
    evaluator: Arc<dyn ScriptEvaluator>,
    source: String,
}

impl ScriptedDefinition {
    pub fn new(evaluator: Arc<dyn ScriptEvaluator>, source: impl Into<String>) -> Self {
        Self {
            evaluator,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(super) fn run(
        &self,
        output: &PluginId,
        context: &ResolutionContext,
        dependencies: &AttributeMap,
    ) -> Result<Vec<AttributeValue>, PluginError> {
        let bindings = ScriptBindings {
            attributes: dependencies.clone(),
            principal: context.principal().map(str::to_string),
            issuer: context.issuer().map(str::to_string),
            recipient: context.recipient().map(str::to_string),
        };
        let values = self
            .evaluator
            .evaluate(&self.source, &bindings, output.as_str())?;
        Ok(values.unwrap_or_default())
    }

    pub(super) fn check_settings(&self, plugin: &PluginId) -> Result<(), ResolverConfigError> {
        if self.source.trim().is_empty() {
            return Err(ResolverConfigError::MissingSetting {
                plugin: plugin.clone(),
                setting: "script source",
            });
        }
        self.evaluator
            .check_source(&self.source)
            .map_err(|e| ResolverConfigError::InvalidSetting {
                plugin: plugin.clone(),
                reason: format!("script does not compile: {e}"),
            })
    }
}

impl Debug for ScriptedDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedDefinition")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
