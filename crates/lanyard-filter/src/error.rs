use thiserror::Error;

/// Invalid filter configuration, detected at build time.
#[derive(Debug, Error)]
pub enum FilterConfigError {
    /// Two policies share an id.
    #[error("duplicate filter policy '{0}'")]
    DuplicatePolicy(String),

    /// An AND or OR node has no children.
    #[error("policy '{policy}': empty {combinator} in {location}")]
    EmptyCombinator {
        policy: String,
        combinator: &'static str,
        location: String,
    },

    /// An attribute rule has neither permit nor deny matchers.
    #[error("policy '{policy}': rule for attribute '{attribute}' has no matchers")]
    EmptyRule { policy: String, attribute: String },

    /// An attribute rule names no attribute.
    #[error("policy '{policy}': attribute rule has no attribute id")]
    MissingAttributeId { policy: String },

    /// An entity group matcher names no group.
    #[error("entity group matcher has no group id")]
    BlankEntityGroup,

    /// A regular expression does not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for filter construction.
pub type Result<T> = std::result::Result<T, FilterConfigError>;
