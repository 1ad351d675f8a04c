//! # Lanyard
//!
//! Attribute resolution and release filtering for identity providers.
//!
//! Given an authenticated principal and the party asking about them,
//! Lanyard gathers attributes from configured sources, derives new ones
//! through a dependency graph of plugins, and then decides which of those
//! attributes and values may be released to that party.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          AttributeService                          │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌────────────────┐ │
//! │  │ AttributeResolver │ → │  FilterContext   │ → │AttributeFilter │ │
//! │  │ (plugin graph)    │   │ (+ party metadata)│   │ (tri-state)    │ │
//! │  └──────────────────┘   └──────────────────┘   └────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use lanyard::{
//!     AttributeDefinition, AttributeFilter, AttributeFilterPolicy, AttributeResolver,
//!     AttributeRule, AttributeService, DataConnector, DefinitionKind, Dependency, Matcher,
//!     PluginSpec, ReleaseRequest, StaticConnector, StringMatch,
//! };
//! use lanyard::types::Attribute;
//!
//! let resolver = AttributeResolver::builder("default")
//!     .with_connector(DataConnector::fixed(
//!         PluginSpec::new("fixed"),
//!         StaticConnector::new().with_attribute(
//!             Attribute::new("affiliation").with_values(["member", "staff"]),
//!         ),
//!     ))
//!     .with_definition(AttributeDefinition::new(
//!         PluginSpec::new("eduPersonAffiliation")
//!             .with_dependency(Dependency::source("fixed", "affiliation")),
//!         DefinitionKind::Simple,
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let filter = AttributeFilter::builder("default")
//!     .with_policy(AttributeFilterPolicy::new("all", Matcher::Any).with_rule(
//!         AttributeRule::new("eduPersonAffiliation")
//!             .permit(Matcher::value(StringMatch::exact("member"))),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let service = AttributeService::new(Arc::new(resolver), Arc::new(filter));
//! let release = service
//!     .release(ReleaseRequest::new("alice").with_requester("https://sp.example.org"))
//!     .unwrap();
//!
//! assert_eq!(release.attributes["eduPersonAffiliation"].len(), 1);
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

pub use lanyard_types as types;

pub use lanyard_config::{Backends, ConfigError, ConfigLoader, LanyardConfig};
pub use lanyard_filter::{
    AttributeFilter, AttributeFilterBuilder, AttributeFilterPolicy, AttributeRule, EntityGroup,
    FilterConfigError, FilterContext, FilterReport, MatchRule, Matcher, Party, PartyDescriptor,
    PartyMetadataLookup, StaticMetadata, StringMatch, Tristate, ValuePattern,
};
pub use lanyard_resolver::{
    AttributeDefinition, AttributeResolver, AttributeResolverBuilder, BackendError, DataConnector,
    DefinitionKind, Dependency, DirectoryClient, DirectoryConnector, DirectoryEntry,
    DirectoryQuery, PluginSpec, QueryTemplate, RegexSplit, RelationalClient, RelationalConnector,
    ResolutionContext, ResolutionError, ResolverConfigError, Row, ScriptBindings, ScriptEvaluator,
    ScriptedDefinition, SqlValue, Statement, StaticConnector, UnavailableBackend, ValidationError,
};

use lanyard_types::AttributeMap;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LanyardError {
    #[error("attribute resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, LanyardError>;

// ============================================================================
// Request / response
// ============================================================================

/// One attribute release: who is asking about whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    principal: String,
    requester: Option<String>,
    issuer: Option<String>,
    authentication_method: Option<String>,
    requested_attributes: Vec<String>,
    allow_cached_results: bool,
}

impl ReleaseRequest {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            requester: None,
            issuer: None,
            authentication_method: None,
            requested_attributes: Vec::new(),
            allow_cached_results: true,
        }
    }

    /// The relying party the attributes are released to.
    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_authentication_method(mut self, method: impl Into<String>) -> Self {
        self.authentication_method = Some(method.into());
        self
    }

    /// Limits resolution to these attribute ids. Empty means all.
    pub fn with_requested_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allow_cached_results(mut self, allow: bool) -> Self {
        self.allow_cached_results = allow;
        self
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn requester(&self) -> Option<&str> {
        self.requester.as_deref()
    }

    fn resolution_context(&self) -> ResolutionContext {
        let mut ctx = ResolutionContext::new(&self.principal)
            .with_requested_attributes(self.requested_attributes.iter().cloned())
            .with_allow_cached_results(self.allow_cached_results);
        if let Some(requester) = &self.requester {
            ctx = ctx.with_recipient(requester);
        }
        if let Some(issuer) = &self.issuer {
            ctx = ctx.with_issuer(issuer);
        }
        if let Some(method) = &self.authentication_method {
            ctx = ctx.with_authentication_method(method);
        }
        ctx
    }
}

/// Released attributes plus the filter's account of how they were chosen.
#[derive(Debug, Clone, Serialize)]
pub struct Release {
    pub attributes: AttributeMap,
    pub report: FilterReport,
}

// ============================================================================
// Service
// ============================================================================

/// Resolve-then-filter pipeline over shared, immutable engines.
///
/// Cheap to clone; every clone shares the same resolver and filter.
#[derive(Clone)]
pub struct AttributeService {
    resolver: Arc<AttributeResolver>,
    filter: Arc<AttributeFilter>,
    metadata: Option<Arc<dyn PartyMetadataLookup>>,
}

impl AttributeService {
    pub fn new(resolver: Arc<AttributeResolver>, filter: Arc<AttributeFilter>) -> Self {
        Self {
            resolver,
            filter,
            metadata: None,
        }
    }

    /// Builds both engines from configuration.
    ///
    /// Party metadata comes from `backends` when registered there, else
    /// from the `[metadata]` section when it lists any parties.
    pub fn from_config(config: &LanyardConfig, backends: &Backends) -> Result<Self> {
        let resolver = config.build_resolver(backends)?;
        let filter = config.build_filter()?;
        let mut service = Self::new(Arc::new(resolver), Arc::new(filter));

        if let Some(metadata) = backends.metadata() {
            service = service.with_metadata(metadata);
        } else if !config.metadata.parties.is_empty() {
            service = service.with_metadata(Arc::new(config.static_metadata()));
        }
        Ok(service)
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn PartyMetadataLookup>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn resolver(&self) -> &AttributeResolver {
        &self.resolver
    }

    pub fn filter(&self) -> &AttributeFilter {
        &self.filter
    }

    /// Resolves attributes for the request and filters them for release.
    pub fn release(&self, request: ReleaseRequest) -> Result<Release> {
        let mut resolution = request.resolution_context();
        self.resolver.resolve(&mut resolution)?;
        let resolved = resolution.take_resolved_attributes();
        debug!(
            principal = %request.principal,
            resolved = resolved.len(),
            "attributes resolved"
        );

        let mut ctx = FilterContext::new(resolved).with_principal(&request.principal);
        if let Some(requester) = &request.requester {
            ctx = ctx.with_requester(requester);
        }
        if let Some(issuer) = &request.issuer {
            ctx = ctx.with_issuer(issuer);
        }
        if let Some(metadata) = &self.metadata {
            ctx = ctx.with_metadata_lookup(metadata.as_ref());
        }

        let report = self.filter.filter(&mut ctx);
        let attributes = ctx.take_filtered_attributes();
        info!(
            principal = %request.principal,
            requester = request.requester.as_deref().unwrap_or("-"),
            released = attributes.len(),
            "attribute release complete"
        );
        Ok(Release { attributes, report })
    }

    /// Checks every connector's backend.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.resolver.validate()
    }
}

impl Debug for AttributeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeService")
            .field("resolver", &self.resolver.id())
            .field("filter", &self.filter.id())
            .field("metadata", &self.metadata.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_requester_to_recipient() {
        let request = ReleaseRequest::new("alice")
            .with_requester("https://sp.example.org")
            .with_issuer("https://idp.example.org")
            .with_allow_cached_results(false);
        let ctx = request.resolution_context();

        assert_eq!(ctx.principal(), Some("alice"));
        assert_eq!(ctx.recipient(), Some("https://sp.example.org"));
        assert_eq!(ctx.issuer(), Some("https://idp.example.org"));
        assert!(!ctx.allow_cached_results());
    }

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AttributeService>();
    }
}
