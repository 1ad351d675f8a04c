//! Data connectors: plugins that pull attributes from an external source.
//!
//! ```text
//! ResolutionContext ──┐
//!                     ├─> render query ─> backend client ─> mapping ─> AttributeMap
//! dependency attrs ───┘
//! ```

mod directory;
mod relational;
mod static_values;

pub use directory::DirectoryConnector;
pub use relational::RelationalConnector;
pub use static_values::StaticConnector;

use lanyard_types::{AttributeMap, PluginId};
use tracing::debug;

use crate::context::ResolutionContext;
use crate::error::{BackendError, PluginError, ResolverConfigError};
use crate::plugin::{PluginSpec, ResolverPlugin};

/// Backend flavour of a data connector.
#[derive(Debug)]
pub enum ConnectorKind {
    /// Fixed attributes, identical for every request.
    Static(StaticConnector),
    /// Templated directory search.
    Directory(DirectoryConnector),
    /// Templated parameterized SQL statement.
    Relational(RelationalConnector),
}

impl ConnectorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectorKind::Static(_) => "static",
            ConnectorKind::Directory(_) => "directory",
            ConnectorKind::Relational(_) => "relational",
        }
    }
}

/// A resolver plugin that fetches attributes from a backend.
#[derive(Debug)]
pub struct DataConnector {
    spec: PluginSpec,
    kind: ConnectorKind,
    failover: Option<PluginId>,
    no_result_is_error: bool,
}

impl DataConnector {
    pub fn new(spec: PluginSpec, kind: ConnectorKind) -> Self {
        Self {
            spec,
            kind,
            failover: None,
            no_result_is_error: false,
        }
    }

    /// Shorthand for a static connector.
    pub fn fixed(spec: PluginSpec, connector: StaticConnector) -> Self {
        Self::new(spec, ConnectorKind::Static(connector))
    }

    /// Shorthand for a directory connector.
    pub fn directory(spec: PluginSpec, connector: DirectoryConnector) -> Self {
        Self::new(spec, ConnectorKind::Directory(connector))
    }

    /// Shorthand for a relational connector.
    pub fn relational(spec: PluginSpec, connector: RelationalConnector) -> Self {
        Self::new(spec, ConnectorKind::Relational(connector))
    }

    /// Names the connector that substitutes for this one when it fails.
    pub fn with_failover(mut self, failover: impl Into<PluginId>) -> Self {
        self.failover = Some(failover.into());
        self
    }

    /// Treats an empty backend result as a failure.
    pub fn with_no_result_is_error(mut self, enabled: bool) -> Self {
        self.no_result_is_error = enabled;
        self
    }

    pub fn kind(&self) -> &ConnectorKind {
        &self.kind
    }

    pub fn failover(&self) -> Option<&PluginId> {
        self.failover.as_ref()
    }

    pub fn no_result_is_error(&self) -> bool {
        self.no_result_is_error
    }

    /// Fetches this connector's attributes for one request.
    ///
    /// Returns `Ok(None)` when the backend had nothing and that is tolerated.
    pub fn retrieve(
        &self,
        context: &ResolutionContext,
        dependencies: &AttributeMap,
    ) -> Result<Option<AttributeMap>, PluginError> {
        let attributes = match &self.kind {
            ConnectorKind::Static(connector) => connector.fetch(),
            ConnectorKind::Directory(connector) => connector.fetch(context, dependencies)?,
            ConnectorKind::Relational(connector) => connector.fetch(context, dependencies)?,
        };

        if attributes.is_empty() {
            debug!(plugin = %self.spec.id(), kind = self.kind.name(), "connector returned no result");
            if self.no_result_is_error {
                return Err(PluginError::NoResult);
            }
            return Ok(None);
        }

        debug!(
            plugin = %self.spec.id(),
            kind = self.kind.name(),
            attributes = attributes.len(),
            "connector retrieved attributes"
        );
        Ok(Some(attributes))
    }

    /// Checks that the backend is reachable without running a query.
    pub fn validate(&self) -> Result<(), BackendError> {
        match &self.kind {
            ConnectorKind::Static(_) => Ok(()),
            ConnectorKind::Directory(connector) => connector.check_connection(),
            ConnectorKind::Relational(connector) => connector.check_connection(),
        }
    }
}

impl ResolverPlugin for DataConnector {
    fn spec(&self) -> &PluginSpec {
        &self.spec
    }

    fn check_settings(&self) -> Result<(), ResolverConfigError> {
        let id = self.spec.id();
        match &self.kind {
            ConnectorKind::Static(connector) => connector.check_settings(id),
            ConnectorKind::Directory(connector) => connector.check_settings(id),
            ConnectorKind::Relational(connector) => connector.check_settings(id),
        }
    }
}
