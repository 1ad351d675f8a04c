//! Registry of backend clients referenced by name from configuration.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use lanyard_filter::PartyMetadataLookup;
use lanyard_resolver::{DirectoryClient, RelationalClient, ScriptEvaluator, UnavailableBackend};
use tracing::warn;

use crate::ConfigError;

/// Named backend clients available to connectors and scripted definitions.
///
/// Configuration refers to backends by name (`backend = "people"`); the
/// application registers the matching clients here before building.
#[derive(Clone, Default)]
pub struct Backends {
    directories: HashMap<String, Arc<dyn DirectoryClient>>,
    databases: HashMap<String, Arc<dyn RelationalClient>>,
    script_engines: HashMap<String, Arc<dyn ScriptEvaluator>>,
    metadata: Option<Arc<dyn PartyMetadataLookup>>,
    offline_fallback: bool,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, name: impl Into<String>, client: Arc<dyn DirectoryClient>) -> Self {
        self.directories.insert(name.into(), client);
        self
    }

    pub fn with_database(mut self, name: impl Into<String>, client: Arc<dyn RelationalClient>) -> Self {
        self.databases.insert(name.into(), client);
        self
    }

    pub fn with_script_engine(
        mut self,
        name: impl Into<String>,
        engine: Arc<dyn ScriptEvaluator>,
    ) -> Self {
        self.script_engines.insert(name.into(), engine);
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn PartyMetadataLookup>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Wires unregistered backends to an offline client instead of failing.
    ///
    /// Plugins using them fail at request time with an "unavailable"
    /// backend error, which failover connectors can absorb.
    pub fn with_offline_fallback(mut self) -> Self {
        self.offline_fallback = true;
        self
    }

    pub fn metadata(&self) -> Option<Arc<dyn PartyMetadataLookup>> {
        self.metadata.clone()
    }

    pub(crate) fn directory(&self, plugin: &str, name: &str) -> Result<Arc<dyn DirectoryClient>, ConfigError> {
        lookup(&self.directories, plugin, name, "directory", self.offline_fallback)
    }

    pub(crate) fn database(&self, plugin: &str, name: &str) -> Result<Arc<dyn RelationalClient>, ConfigError> {
        lookup(&self.databases, plugin, name, "relational", self.offline_fallback)
    }

    pub(crate) fn script_engine(
        &self,
        plugin: &str,
        name: &str,
    ) -> Result<Arc<dyn ScriptEvaluator>, ConfigError> {
        lookup(&self.script_engines, plugin, name, "script", self.offline_fallback)
    }
}

/// Clients that can stand in for an unreachable backend.
trait Offline {
    fn offline(name: &str) -> Self;
}

impl Offline for Arc<dyn DirectoryClient> {
    fn offline(name: &str) -> Self {
        Arc::new(UnavailableBackend::new(name))
    }
}

impl Offline for Arc<dyn RelationalClient> {
    fn offline(name: &str) -> Self {
        Arc::new(UnavailableBackend::new(name))
    }
}

impl Offline for Arc<dyn ScriptEvaluator> {
    fn offline(name: &str) -> Self {
        Arc::new(UnavailableBackend::new(name))
    }
}

fn lookup<T: Clone + Offline>(
    registry: &HashMap<String, T>,
    plugin: &str,
    name: &str,
    kind: &'static str,
    offline_fallback: bool,
) -> Result<T, ConfigError> {
    if let Some(client) = registry.get(name) {
        return Ok(client.clone());
    }
    if offline_fallback {
        warn!(plugin, backend = name, kind, "backend not registered, using offline client");
        return Ok(T::offline(name));
    }
    Err(ConfigError::UnknownBackend {
        plugin: plugin.to_string(),
        kind,
        backend: name.to_string(),
    })
}

impl Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("directories", &self.directories.keys().collect::<Vec<_>>())
            .field("databases", &self.databases.keys().collect::<Vec<_>>())
            .field("script_engines", &self.script_engines.keys().collect::<Vec<_>>())
            .field("metadata", &self.metadata.is_some())
            .field("offline_fallback", &self.offline_fallback)
            .finish()
    }
}
