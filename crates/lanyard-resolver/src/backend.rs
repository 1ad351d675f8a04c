//! Injected backend client interfaces.
//!
//! The resolver never opens sockets or pools itself. Connectors receive a
//! client through these traits and hand it a fully rendered query. Timeouts
//! are the client's responsibility.

use std::collections::BTreeMap;

use bytes::Bytes;
use lanyard_types::{AttributeMap, AttributeValue};

use crate::error::BackendError;

// ============================================================================
// Directory
// ============================================================================

/// One raw attribute value returned by a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    Binary(Bytes),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// A directory entry: distinguished name plus multi-valued attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<RawValue>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        self.attributes
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }
}

/// A rendered directory search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryQuery {
    pub base_dn: String,
    /// Search filter with all request values already escaped.
    pub filter: String,
    /// Attributes to return. Empty means all.
    pub return_attributes: Vec<String>,
    /// Whether the client may answer from a cache.
    pub allow_cached: bool,
}

/// Client for an LDAP-style directory.
pub trait DirectoryClient: Send + Sync {
    fn search(&self, query: &DirectoryQuery) -> Result<Vec<DirectoryEntry>, BackendError>;

    /// Opens and closes a connection without querying.
    fn check_connection(&self) -> Result<(), BackendError>;
}

// ============================================================================
// Relational
// ============================================================================

/// A bind parameter or column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Binary(Bytes),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

/// One result row, keyed by column label.
pub type Row = BTreeMap<String, SqlValue>;

/// A parameterized statement with positional `?` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub allow_cached: bool,
}

/// Client for a relational database.
pub trait RelationalClient: Send + Sync {
    fn query(&self, statement: &Statement) -> Result<Vec<Row>, BackendError>;

    /// Obtains and releases a connection without querying.
    fn check_connection(&self) -> Result<(), BackendError>;
}

// ============================================================================
// Scripting
// ============================================================================

/// Inputs visible to a script.
#[derive(Debug, Clone, Default)]
pub struct ScriptBindings {
    /// Dependency attributes, keyed by attribute id.
    pub attributes: AttributeMap,
    pub principal: Option<String>,
    pub issuer: Option<String>,
    pub recipient: Option<String>,
}

/// Executes script source on behalf of scripted definitions.
pub trait ScriptEvaluator: Send + Sync {
    /// Runs `source` and returns the values bound to `output`.
    ///
    /// `Ok(None)` means the script left the output binding unset.
    fn evaluate(
        &self,
        source: &str,
        bindings: &ScriptBindings,
        output: &str,
    ) -> Result<Option<Vec<AttributeValue>>, BackendError>;

    /// Compiles `source` without running it.
    fn check_source(&self, _source: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

// ============================================================================
// Offline client
// ============================================================================

/// A client for a backend that is not reachable from this process.
///
/// Every call fails with [`BackendErrorKind::Unavailable`](crate::BackendErrorKind::Unavailable).
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    name: String,
}

impl UnavailableBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn error(&self) -> BackendError {
        BackendError::unavailable(format!("no client configured for backend '{}'", self.name))
    }
}

impl DirectoryClient for UnavailableBackend {
    fn search(&self, _query: &DirectoryQuery) -> Result<Vec<DirectoryEntry>, BackendError> {
        Err(self.error())
    }

    fn check_connection(&self) -> Result<(), BackendError> {
        Err(self.error())
    }
}

impl RelationalClient for UnavailableBackend {
    fn query(&self, _statement: &Statement) -> Result<Vec<Row>, BackendError> {
        Err(self.error())
    }

    fn check_connection(&self) -> Result<(), BackendError> {
        Err(self.error())
    }
}

impl ScriptEvaluator for UnavailableBackend {
    fn evaluate(
        &self,
        _source: &str,
        _bindings: &ScriptBindings,
        _output: &str,
    ) -> Result<Option<Vec<AttributeValue>>, BackendError> {
        Err(self.error())
    }
}
