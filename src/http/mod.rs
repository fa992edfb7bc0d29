//! HTTP transport adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (server fields, query, form → RequestSources)
//!     → routing::Router::dispatch
//!     → response.rs (Reply → status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{extract_sources, RequestError, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
