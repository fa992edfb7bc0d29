//! Parameter-injecting dispatch.
//!
//! # Data Flow
//! ```text
//! Router (route matched, filters pending)
//!     → context.rs (Scope: sources + params + store + renderer)
//!     → FilterResults accumulate while the chain runs
//!     → RequestContext built per invocation (sanitized filter table)
//!     → handler.rs (Handler::call, or Bound resolves its manifest into Args)
//!     → reply.rs (Reply handed back to the transport)
//! ```
//!
//! # Design Decisions
//! - No runtime reflection: handlers read the typed context, or declare a
//!   parameter manifest that is validated when the handler is built
//! - Reserved parameter names map to built-in accessors and helpers
//! - Errors from handlers propagate untouched to the caller

pub mod context;
pub mod handler;
pub mod helpers;
pub mod reply;

pub use context::{Accessor, FilterResults, Map, RequestContext, RequestSources, Scope};
pub use handler::{bind, from_fn, Arg, Args, Binding, Bound, FnHandler, Handler};
pub use helpers::{JsonResponder, Redirector, RenderHelper, Renderer};
pub use reply::Reply;
