//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Build (at startup):
//!     RouterBuilder (routes, filters, store, mounts)
//!     → filter.rs (resolve dependency graph, detect cycles)
//!     → chain.rs (resolve each route's expression)
//!     → pattern.rs (compile patterns to anchored regexes)
//!     → Freeze as immutable Router
//!
//! Dispatch (per request):
//!     path + RequestSources
//!     → router.rs (walk routes in registration order)
//!     → pattern.rs (match, extract params / remainder)
//!     → chain.rs (evaluate filters, commit results)
//!     → handler, or recurse into mounted Router
//!     → Return: Matched(Reply) or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - First match wins (registration order)
//! - Unknown filters and dependency cycles are build errors, never request errors
//! - Deterministic: same input always matches same route

pub mod builtin;
pub mod chain;
pub mod filter;
pub mod pattern;
pub mod router;

pub use builtin::{IS_AJAX, IS_DELETE, IS_GET, IS_POST, IS_PUT};
pub use chain::{is_truthy, FilterChain};
pub use filter::{Filter, FilterRef, FilterRegistry, FilterSet};
pub use pattern::{PathMatch, PathPattern};
pub use router::{MatchOutcome, Router, RouterBuilder};
