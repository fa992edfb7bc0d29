//! Waypoint: route matching and filter-chain dispatch.
//!
//! Routes pair a `<name>`-placeholder pattern with a filter expression and a
//! handler or a mounted sub-router. Filters are named predicates that may
//! depend on one another, may be negated per use, and hand their values on to
//! the handler. The whole tree is resolved once by [`RouterBuilder::build`]
//! and then served read-only.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod observability;
pub mod routing;

pub use config::AppConfig;
pub use dispatch::{bind, from_fn, Handler, Reply, RequestContext, RequestSources};
pub use error::{BoxError, ConfigurationError, DispatchError};
pub use http::HttpServer;
pub use routing::{MatchOutcome, Router, RouterBuilder};
