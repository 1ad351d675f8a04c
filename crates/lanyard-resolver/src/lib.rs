//! # lanyard-resolver: Attribute resolution for `Lanyard`
//!
//! Resolves a subject's attributes by walking a graph of plugins:
//!
//! - **Data connectors** fetch raw attributes from a backend (static values,
//!   a directory search, a relational query).
//! - **Attribute definitions** derive one attribute each from the
//!   attributes their dependencies produced.
//!
//! ```text
//!   ResolutionContext (principal, issuer, recipient, requested names)
//!          │
//!          ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ AttributeResolver                            │
//!   │                                              │
//!   │   eduPersonPrincipalName ── uid ──┐          │
//!   │                                   ├── ldap ──┼──> DirectoryClient
//!   │   mail ───────────────────────────┘    │     │
//!   │                                    failover  │
//!   │                                        ▼     │
//!   │                                     static   │
//!   └──────────────────────────────────────────────┘
//!          │
//!          ▼
//!   resolved AttributeMap written back into the context
//! ```
//!
//! The graph is validated once by [`AttributeResolverBuilder::build`]:
//! duplicate ids, dangling references and cycles are configuration errors,
//! never request-time errors. Each plugin runs at most once per
//! [`AttributeResolver::resolve`] call.
//!
//! ## Example
//!
//! ```
//! use lanyard_resolver::{
//!     AttributeDefinition, AttributeResolver, DataConnector, DefinitionKind, Dependency,
//!     PluginSpec, ResolutionContext, StaticConnector,
//! };
//! use lanyard_types::Attribute;
//!
//! let resolver = AttributeResolver::builder("default")
//!     .with_connector(DataConnector::fixed(
//!         PluginSpec::new("static"),
//!         StaticConnector::new().with_attribute(Attribute::new("affiliation").with_value("member")),
//!     ))
//!     .with_definition(AttributeDefinition::new(
//!         PluginSpec::new("eduPersonAffiliation").with_dependency(Dependency::on("static")),
//!         DefinitionKind::Simple,
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let mut ctx = ResolutionContext::new("alice");
//! resolver.resolve(&mut ctx).unwrap();
//! assert!(ctx.resolved_attributes().contains_key("eduPersonAffiliation"));
//! ```

mod backend;
mod connector;
mod context;
mod definition;
mod error;
mod mapping;
mod plugin;
mod resolver;
mod template;


pub use backend::{
    DirectoryClient, DirectoryEntry, DirectoryQuery, RawValue, RelationalClient, Row,
    ScriptBindings, ScriptEvaluator, SqlValue, Statement, UnavailableBackend,
};
pub use connector::{
    ConnectorKind, DataConnector, DirectoryConnector, RelationalConnector, StaticConnector,
};
pub use context::{ResolutionContext, WorkContext};
pub use definition::{AttributeDefinition, DefinitionKind, RegexSplit, ScriptedDefinition};
pub use error::{
    BackendError, BackendErrorKind, PluginError, ResolutionError, ResolverConfigError, Result,
    ValidationError,
};
pub use mapping::{EntryMapping, ResultMapping, RowMapping};
pub use plugin::{
    ActivationCondition, AuthenticationMethodIn, Dependency, PluginSpec, RecipientIn,
    ResolverPlugin,
};
pub use resolver::{AttributeResolver, AttributeResolverBuilder};
pub use template::{QueryTemplate, TemplateError, TemplateVars, escape_filter_value};
