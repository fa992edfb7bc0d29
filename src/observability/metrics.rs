//! Metrics collection and exposition.
//!
//! # Metrics
//! - `waypoint_dispatch_total` (counter): dispatches by outcome
//!   (`matched`, `no_match`, `error`)
//! - `waypoint_dispatch_duration_seconds` (histogram): time spent in the
//!   routing core, handler included
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the routing core
//!   can always record and tests need no setup
//! - Prometheus endpoint is opt-in through configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const DISPATCH_TOTAL: &str = "waypoint_dispatch_total";
pub const DISPATCH_DURATION: &str = "waypoint_dispatch_duration_seconds";

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatch.
pub fn record_dispatch(outcome: &'static str, start: Instant) {
    metrics::counter!(DISPATCH_TOTAL, "outcome" => outcome).increment(1);
    metrics::histogram!(DISPATCH_DURATION).record(start.elapsed().as_secs_f64());
}
