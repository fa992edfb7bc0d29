//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing core and transport produce:
//!     → tracing events (route match, filter rejection, failures)
//!     → metrics.rs (dispatch counters, latency histogram)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP trace span
//! - Filter rejections are debug events, never warnings

pub mod logging;
pub mod metrics;
