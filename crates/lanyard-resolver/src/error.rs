//! Error types for attribute resolution.
//!
//! Three layers:
//! - [`ResolverConfigError`]: raised by [`AttributeResolverBuilder::build`](crate::AttributeResolverBuilder::build),
//!   never at request time.
//! - [`PluginError`]: what a single connector or definition reports.
//! - [`ResolutionError`]: a plugin failure tagged with the failing plugin id,
//!   returned from [`AttributeResolver::resolve`](crate::AttributeResolver::resolve).

use std::fmt::Display;

use lanyard_types::{PluginId, ValueKind};
use thiserror::Error;

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolutionError>;

// ============================================================================
// Backend errors
// ============================================================================

/// Category of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// Could not reach or open a connection to the backend.
    Connection,
    /// The backend rejected or failed the query.
    Query,
    /// The backend did not answer in time.
    Timeout,
    /// The script engine failed to compile or execute a script.
    Script,
    /// No client is available for this backend.
    Unavailable,
}

impl Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendErrorKind::Connection => "connection",
            BackendErrorKind::Query => "query",
            BackendErrorKind::Timeout => "timeout",
            BackendErrorKind::Script => "script",
            BackendErrorKind::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// Error raised by an injected backend client.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Connection, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Query, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Script, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    /// Attaches the client library's own error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

// ============================================================================
// Plugin errors
// ============================================================================

/// Failure of a single connector or definition.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The backend client failed.
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    /// The backend returned nothing and the connector treats that as an error.
    #[error("no result returned from backend")]
    NoResult,

    /// A dependency supplied a value of a type the definition cannot process.
    #[error("unsupported value type: expected {expected}, got {actual}")]
    UnsupportedValueType {
        expected: &'static str,
        actual: ValueKind,
    },

    /// A query template placeholder had no value in this request.
    #[error("no value for query template parameter '{0}'")]
    MissingTemplateValue(String),

    /// Raw backend results could not be mapped into attributes.
    #[error("result mapping failed: {0}")]
    Mapping(String),
}

// ============================================================================
// Resolution errors
// ============================================================================

/// A failed resolution pass.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// A plugin failed and no failover absorbed the failure.
    #[error("plugin '{plugin}' failed: {source}")]
    Plugin {
        plugin: PluginId,
        #[source]
        source: PluginError,
    },

    /// A data connector failed and so did its failover connector.
    #[error("data connector '{plugin}' failed ({primary}) and failover '{failover}' also failed: {source}")]
    FailoverFailed {
        plugin: PluginId,
        failover: PluginId,
        primary: PluginError,
        #[source]
        source: Box<ResolutionError>,
    },
}

impl ResolutionError {
    /// The plugin whose failure aborted the pass.
    pub fn plugin_id(&self) -> &PluginId {
        match self {
            ResolutionError::Plugin { plugin, .. } | ResolutionError::FailoverFailed { plugin, .. } => {
                plugin
            }
        }
    }

    /// Returns `true` if the root cause is an unsupported value type.
    pub fn is_unsupported_value_type(&self) -> bool {
        match self {
            ResolutionError::Plugin { source, .. } => {
                matches!(source, PluginError::UnsupportedValueType { .. })
            }
            ResolutionError::FailoverFailed { source, .. } => source.is_unsupported_value_type(),
        }
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

/// Invalid resolver configuration, detected at build time.
#[derive(Debug, Error)]
pub enum ResolverConfigError {
    /// Two plugins share an id.
    #[error("duplicate plugin id '{0}'")]
    DuplicatePlugin(PluginId),

    /// A plugin depends on an id that is not registered.
    #[error("plugin '{plugin}' depends on unknown plugin '{dependency}'")]
    MissingDependency {
        plugin: PluginId,
        dependency: PluginId,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle: {}", format_cycle(.cycle))]
    DependencyCycle { cycle: Vec<PluginId> },

    /// A failover reference is unusable.
    #[error("data connector '{plugin}' has invalid failover '{failover}': {reason}")]
    InvalidFailover {
        plugin: PluginId,
        failover: PluginId,
        reason: &'static str,
    },

    /// A required setting is absent.
    #[error("plugin '{plugin}': no {setting} was configured")]
    MissingSetting {
        plugin: PluginId,
        setting: &'static str,
    },

    /// A setting is present but unusable.
    #[error("plugin '{plugin}': {reason}")]
    InvalidSetting { plugin: PluginId, reason: String },
}

fn format_cycle(cycle: &[PluginId]) -> String {
    cycle
        .iter()
        .map(PluginId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A connector failed its startup health check.
#[derive(Debug, Error)]
#[error("data connector '{plugin}' failed validation: {source}")]
pub struct ValidationError {
    pub plugin: PluginId,
    #[source]
    pub source: BackendError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = ResolverConfigError::DependencyCycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn failover_failure_reports_primary_plugin() {
        let err = ResolutionError::FailoverFailed {
            plugin: "ldap".into(),
            failover: "static".into(),
            primary: PluginError::Backend(BackendError::connection("refused")),
            source: Box::new(ResolutionError::Plugin {
                plugin: "static".into(),
                source: PluginError::NoResult,
            }),
        };
        assert_eq!(err.plugin_id().as_str(), "ldap");
        assert!(err.to_string().contains("connection error: refused"));
    }
}
