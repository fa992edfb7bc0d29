//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single fallback handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Translate each request into `RequestSources` and dispatch it
//! - Map the outcome to a response; failures never leak details to clients
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::request::{extract_sources, X_REQUEST_ID};
use crate::http::response;
use crate::routing::{MatchOutcome, Router};

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub max_body_bytes: usize,
}

/// HTTP front end for a built [`Router`].
pub struct HttpServer {
    app: axum::Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `router`.
    pub fn new(config: AppConfig, router: Router) -> Self {
        let state = AppState {
            router: Arc::new(router),
            max_body_bytes: config.listener.max_body_bytes,
        };
        let app = Self::build_router(&config, state);
        Self { app, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> axum::Router {
        axum::Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The Axum app, for serving elsewhere or driving in tests.
    pub fn app(&self) -> axum::Router {
        self.app.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Every request lands here; the routing core decides what it means.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let sources = match extract_sources(request, state.max_body_bytes).await {
        Ok(sources) => sources,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Rejected request body");
            return response::bad_request("Unreadable request body");
        }
    };
    let path = sources.request_path().unwrap_or_else(|| "/".to_string());

    match state.router.dispatch(&path, &sources) {
        Ok(MatchOutcome::Matched(reply)) => reply.into_response(),
        Ok(MatchOutcome::NoMatch) => response::not_found(),
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Dispatch failed");
            response::internal_error()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
