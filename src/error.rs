//! Error taxonomy.
//!
//! # Design Decisions
//! - `ConfigurationError` is fatal and only produced while building a router
//! - A filter returning a falsy value is not an error; it never shows up here
//! - Errors raised by handlers and predicates are carried, not swallowed

use thiserror::Error;

/// Error type returned by handlers and filter predicates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Problems detected while building the routing tree.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A filter name was registered twice on the same router.
    #[error("filter already defined [{0}]")]
    DuplicateFilter(String),

    /// Filter names are whitespace-free tokens.
    #[error("invalid filter name [{0}]")]
    InvalidFilterName(String),

    /// An expression or dependency list references an unregistered filter.
    #[error("unknown filter [{name}] in expression \"{expression}\"")]
    UnknownFilter { name: String, expression: String },

    /// Filter dependencies loop back onto themselves.
    #[error("filter dependency cycle: {}", .0.join(" -> "))]
    FilterCycle(Vec<String>),

    /// A handler's parameter manifest cannot be bound.
    #[error("cannot bind parameter [{parameter}]: {reason}")]
    UninvocableTarget { parameter: String, reason: &'static str },

    /// The route pattern does not compile.
    #[error("invalid route pattern [{pattern}]: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Failures raised while serving a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The matched route's handler returned an error.
    #[error("handler for route [{route}] failed: {source}")]
    Handler {
        route: String,
        #[source]
        source: BoxError,
    },

    /// A filter predicate returned an error (as opposed to a falsy value).
    #[error("filter [{filter}] failed: {source}")]
    Filter {
        filter: String,
        #[source]
        source: BoxError,
    },
}

/// Errors from the render helper.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no renderer configured")]
    NoRenderer,

    #[error("template [{template}] failed: {source}")]
    Template {
        template: String,
        #[source]
        source: BoxError,
    },
}
