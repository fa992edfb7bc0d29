//! Waypoint demo server.
//!
//! ```text
//!     Client Request
//!         → tower-http (request ID, trace, timeout)
//!         → http::request (RequestSources)
//!         → routing::Router (match → filters → handler | mount)
//!         → http::response (Reply → HTTP)
//!     Client Response
//! ```
//!
//! Routes served:
//! - `GET /`: greets the `X-User` header's user, or a stranger
//! - `GET /api/status`, `GET /api/echo/<word>`: ajax requests from a known user

use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use waypoint::config::{load_config, AppConfig};
use waypoint::observability::{logging, metrics};
use waypoint::{bind, from_fn, BoxError, ConfigurationError, HttpServer, Reply, RouterBuilder};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Route matching and filter-chain dispatch server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn demo_app(config: &AppConfig) -> Result<RouterBuilder, ConfigurationError> {
    let mut app = RouterBuilder::new(&config.routing.base_path).with_store(config.store.clone());

    app.register_filter(
        "is:logged",
        &[],
        from_fn(|ctx| -> Result<Value, BoxError> {
            Ok(ctx.server().get("HTTP_X_USER").cloned().unwrap_or(Value::Null))
        }),
    )?;

    app.get(
        "/",
        "is:logged",
        bind(&["logged"], |args| {
            let user = args[0].as_str().unwrap_or("friend");
            Ok(Reply::text(format!("Hello, {user}!")))
        })?,
    )?;
    app.get("/", "", from_fn(|_ctx| Ok(Reply::text("Hello, stranger!"))))?;

    let mut api = RouterBuilder::default();
    api.get(
        "/status",
        "",
        bind(&["filter", "json"], |args| {
            let user = args[0].accessor().and_then(|filter| filter.get("logged").cloned());
            let json = args[1].json().unwrap_or_default();
            Ok(json.respond(&json!({ "status": "ok", "user": user }))?)
        })?,
    )?;
    api.get(
        "/echo/<word>",
        "",
        from_fn(|ctx| {
            let word = ctx.param().str("word").unwrap_or_default();
            Ok(Reply::json(json!({ "echo": word })))
        }),
    )?;
    app.mount("/api", "is:logged is:ajax", api)?;

    Ok(app)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("waypoint v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.routing.base_path,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = demo_app(&config)?.build()?;
    tracing::debug!(routes = ?router, "Routes compiled");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, router);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
