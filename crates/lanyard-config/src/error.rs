//! Configuration error types

use lanyard_filter::FilterConfigError;
use lanyard_resolver::{ResolverConfigError, TemplateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid resolver configuration: {0}")]
    ResolverError(#[from] ResolverConfigError),

    #[error("Invalid filter configuration: {0}")]
    FilterError(#[from] FilterConfigError),

    #[error("Plugin '{plugin}' references unknown {kind} backend '{backend}'")]
    UnknownBackend {
        plugin: String,
        kind: &'static str,
        backend: String,
    },

    #[error("Plugin '{plugin}' has an invalid query template: {source}")]
    TemplateError {
        plugin: String,
        #[source]
        source: TemplateError,
    },

    #[error("Plugin '{plugin}' has an invalid pattern '{pattern}': {source}")]
    PatternError {
        plugin: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
