use std::fmt::Debug;
use std::sync::Arc;

use lanyard_types::{AttributeMap, PluginId};
use tracing::debug;

use crate::backend::{RelationalClient, Row, Statement};
use crate::context::ResolutionContext;
use crate::error::{BackendError, PluginError, ResolverConfigError};
use crate::mapping::{ResultMapping, RowMapping};
use crate::template::{QueryTemplate, TemplateVars};

/// Runs a templated SQL statement.
///
/// Placeholders become positional `?` binds; request values are never
/// spliced into the SQL text.
pub struct RelationalConnector {
    client: Arc<dyn RelationalClient>,
    statement: QueryTemplate,
    mapping: Arc<dyn ResultMapping<Row>>,
}

impl RelationalConnector {
    pub fn new(client: Arc<dyn RelationalClient>, statement: QueryTemplate) -> Self {
        Self {
            client,
            statement,
            mapping: Arc::new(RowMapping::default()),
        }
    }

    pub fn with_mapping(mut self, mapping: impl ResultMapping<Row> + 'static) -> Self {
        self.mapping = Arc::new(mapping);
        self
    }

    /// Builds the statement for one request.
    pub fn build_statement(
        &self,
        context: &ResolutionContext,
        dependencies: &AttributeMap,
    ) -> Result<Statement, PluginError> {
        let (sql, params) = self
            .statement
            .render_parameterized(&TemplateVars::new(context, dependencies))?;
        Ok(Statement {
            sql,
            params,
            allow_cached: context.allow_cached_results(),
        })
    }

    pub(super) fn fetch(
        &self,
        context: &ResolutionContext,
        dependencies: &AttributeMap,
    ) -> Result<AttributeMap, PluginError> {
        let statement = self.build_statement(context, dependencies)?;
        debug!(sql = %statement.sql, params = statement.params.len(), "relational query");
        let rows = self.client.query(&statement)?;
        self.mapping.map(&rows)
    }

    pub(super) fn check_connection(&self) -> Result<(), BackendError> {
        self.client.check_connection()
    }

    pub(super) fn check_settings(&self, plugin: &PluginId) -> Result<(), ResolverConfigError> {
        if self.statement.as_str().trim().is_empty() {
            return Err(ResolverConfigError::MissingSetting {
                plugin: plugin.clone(),
                setting: "query template",
            });
        }
        Ok(())
    }
}

impl Debug for RelationalConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalConnector")
            .field("statement", &self.statement.as_str())
            .finish_non_exhaustive()
    }
}
