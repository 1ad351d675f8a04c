use std::fmt::Debug;
use std::sync::Arc;

use lanyard_types::{AttributeMap, PluginId};
use tracing::debug;

use crate::backend::{DirectoryClient, DirectoryEntry, DirectoryQuery};
use crate::context::ResolutionContext;
use crate::error::{BackendError, PluginError, ResolverConfigError};
use crate::mapping::{EntryMapping, ResultMapping};
use crate::template::{QueryTemplate, TemplateVars, escape_filter_value};

/// Searches a directory with a templated filter.
///
/// Request values substituted into the filter are RFC 4515 escaped.
pub struct DirectoryConnector {
    client: Arc<dyn DirectoryClient>,
    base_dn: String,
    filter: QueryTemplate,
    return_attributes: Vec<String>,
    mapping: Arc<dyn ResultMapping<DirectoryEntry>>,
}

impl DirectoryConnector {
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        base_dn: impl Into<String>,
        filter: QueryTemplate,
    ) -> Self {
        Self {
            client,
            base_dn: base_dn.into(),
            filter,
            return_attributes: Vec::new(),
            mapping: Arc::new(EntryMapping::default()),
        }
    }

    pub fn with_return_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mapping(mut self, mapping: impl ResultMapping<DirectoryEntry> + 'static) -> Self {
        self.mapping = Arc::new(mapping);
        self
    }

    pub fn filter(&self) -> &QueryTemplate {
        &self.filter
    }

    /// Builds the search for one request.
    pub fn build_query(
        &self,
        context: &ResolutionContext,
        dependencies: &AttributeMap,
    ) -> Result<DirectoryQuery, PluginError> {
        let filter = self
            .filter
            .render(&TemplateVars::new(context, dependencies), escape_filter_value)?;
        Ok(DirectoryQuery {
            base_dn: self.base_dn.clone(),
            filter,
            return_attributes: self.return_attributes.clone(),
            allow_cached: context.allow_cached_results(),
        })
    }

    pub(super) fn fetch(
        &self,
        context: &ResolutionContext,
        dependencies: &AttributeMap,
    ) -> Result<AttributeMap, PluginError> {
        let query = self.build_query(context, dependencies)?;
        debug!(base_dn = %query.base_dn, filter = %query.filter, "directory search");
        let entries = self.client.search(&query)?;
        self.mapping.map(&entries)
    }

    pub(super) fn check_connection(&self) -> Result<(), BackendError> {
        self.client.check_connection()
    }

    pub(super) fn check_settings(&self, plugin: &PluginId) -> Result<(), ResolverConfigError> {
        if self.filter.as_str().trim().is_empty() {
            return Err(ResolverConfigError::MissingSetting {
                plugin: plugin.clone(),
                setting: "search filter",
            });
        }
        Ok(())
    }
}

impl Debug for DirectoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConnector")
            .field("base_dn", &self.base_dn)
            .field("filter", &self.filter.as_str())
            .field("return_attributes", &self.return_attributes)
            .finish_non_exhaustive()
    }
}
