//! Configuration management for Lanyard
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (LANYARD_* prefix, `__` between sections)
//! 2. lanyard.local.toml (gitignored, local overrides)
//! 3. lanyard.toml (git-tracked, deployment config)
//! 4. ~/.config/lanyard/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! The loaded [`LanyardConfig`] is declarative. Turning it into a running
//! resolver and filter needs the backend clients, supplied through
//! [`Backends`].

use lanyard_filter::{AttributeFilter, StaticMetadata};
use lanyard_resolver::AttributeResolver;
use serde::{Deserialize, Serialize};

mod backends;
mod error;
mod filter;
mod loader;
mod paths;
mod resolver;

pub use backends::Backends;
pub use error::ConfigError;
pub use filter::{
    AttributeRuleConfig, EntityAttributeConfig, FilterConfig, MatcherConfig, MetadataConfig,
    PartyConfig, PartyMetadataConfig, PolicyConfig,
};
pub use loader::ConfigLoader;
pub use resolver::{
    ActivationConfig, ConnectorConfig, ConnectorSource, DefinitionConfig, DefinitionSource,
    DependencyConfig, RenameConfig, ResolverConfig, StaticAttributeConfig,
};

/// Main Lanyard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanyardConfig {
    pub resolver: ResolverConfig,
    pub filter: FilterConfig,
    pub metadata: MetadataConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LanyardConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Load configuration from a specific directory
    pub fn load_from_dir(dir: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        ConfigLoader::new().with_project_dir(dir).load()
    }

    /// Builds the resolver, resolving backend names against `backends`.
    pub fn build_resolver(&self, backends: &Backends) -> Result<AttributeResolver, ConfigError> {
        self.resolver.build(backends)
    }

    pub fn build_filter(&self) -> Result<AttributeFilter, ConfigError> {
        self.filter.build()
    }

    /// Metadata declared in the `[metadata]` section.
    pub fn static_metadata(&self) -> StaticMetadata {
        self.metadata.build()
    }

    /// Builds everything once to surface configuration errors.
    pub fn validate(&self, backends: &Backends) -> Result<(), ConfigError> {
        self.build_resolver(backends)?;
        self.build_filter()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LanyardConfig::default();
        assert_eq!(config.resolver.id, "default");
        assert_eq!(config.filter.id, "default");
        assert!(config.metadata.parties.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = LanyardConfig::default();
        let toml = toml::to_string(&config).expect("Failed to serialize");
        let deserialized: LanyardConfig = toml::from_str(&toml).expect("Failed to deserialize");

        assert_eq!(config.logging.level, deserialized.logging.level);
        assert_eq!(config.filter.audit, deserialized.filter.audit);
    }

    #[test]
    fn test_empty_config_validates() {
        LanyardConfig::default()
            .validate(&Backends::new())
            .expect("empty config should build");
    }
}
