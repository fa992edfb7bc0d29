//! Route table, build step and dispatch.
//!
//! # Responsibilities
//! - Collect routes, filters, store and renderer while the app is assembled
//! - Freeze the whole tree (mounted routers included) into an immutable `Router`
//! - Dispatch a path: match, guard, then invoke or recurse into a mount
//!
//! # Design Decisions
//! - Registration order is the only priority; first route to fully succeed wins
//! - A mount that finds nothing is just a failed candidate: matching continues
//! - Store and filters inherit downward; a child's own entries shadow its ancestors'
//! - Params and filter results are cloned per attempt, so a rejected route
//!   leaves nothing behind for the next one
//! - Explicit NoMatch rather than an error

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::dispatch::{FilterResults, Handler, Map, Renderer, Reply, RequestSources, Scope};
use crate::error::{ConfigurationError, DispatchError};
use crate::observability::metrics;
use crate::routing::builtin::{IS_AJAX, IS_DELETE, IS_GET, IS_POST, IS_PUT};
use crate::routing::chain::FilterChain;
use crate::routing::filter::{FilterRegistry, FilterSet};
use crate::routing::pattern::{normalize_base_path, PathPattern};

/// Result of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A handler ran and produced this reply.
    Matched(Reply),
    /// Nothing matched; the transport answers "not found".
    NoMatch,
}

impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn into_reply(self) -> Option<Reply> {
        match self {
            MatchOutcome::Matched(reply) => Some(reply),
            MatchOutcome::NoMatch => None,
        }
    }
}

enum PendingTarget {
    Handler(Arc<dyn Handler<Reply>>),
    Mount(RouterBuilder),
}

struct PendingRoute {
    pattern: PathPattern,
    expression: String,
    target: PendingTarget,
}

/// Assembles a router. Nothing is served until [`RouterBuilder::build`].
pub struct RouterBuilder {
    base_path: String,
    store: Map,
    renderer: Option<Arc<dyn Renderer>>,
    filters: FilterRegistry,
    routes: Vec<PendingRoute>,
}

impl RouterBuilder {
    /// Routes are relative to `base_path` (`/app` serves `/app/...`).
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: normalize_base_path(base_path),
            store: Map::new(),
            renderer: None,
            filters: FilterRegistry::with_builtins(),
            routes: Vec::new(),
        }
    }

    /// Replace the shared store.
    pub fn with_store(mut self, store: Map) -> Self {
        self.store = store;
        self
    }

    pub fn store(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.store.insert(key.into(), value.into());
        self
    }

    pub fn renderer(&mut self, renderer: impl Renderer + 'static) -> &mut Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Register a filter. `depends_on` names (optionally `!`-prefixed) run first.
    pub fn register_filter<H>(&mut self, name: &str, depends_on: &[&str], predicate: H) -> Result<&mut Self, ConfigurationError>
    where
        H: Handler<Value> + 'static,
    {
        self.filters.register(name, depends_on, predicate)?;
        Ok(self)
    }

    /// Route matching any method.
    pub fn route<H>(&mut self, pattern: &str, filters: &str, handler: H) -> Result<&mut Self, ConfigurationError>
    where
        H: Handler<Reply> + 'static,
    {
        self.push(pattern, filters.to_string(), PendingTarget::Handler(Arc::new(handler)))
    }

    pub fn get<H>(&mut self, pattern: &str, filters: &str, handler: H) -> Result<&mut Self, ConfigurationError>
    where
        H: Handler<Reply> + 'static,
    {
        self.push(pattern, with_builtin(IS_GET, filters), PendingTarget::Handler(Arc::new(handler)))
    }

    pub fn post<H>(&mut self, pattern: &str, filters: &str, handler: H) -> Result<&mut Self, ConfigurationError>
    where
        H: Handler<Reply> + 'static,
    {
        self.push(pattern, with_builtin(IS_POST, filters), PendingTarget::Handler(Arc::new(handler)))
    }

    pub fn put<H>(&mut self, pattern: &str, filters: &str, handler: H) -> Result<&mut Self, ConfigurationError>
    where
        H: Handler<Reply> + 'static,
    {
        self.push(pattern, with_builtin(IS_PUT, filters), PendingTarget::Handler(Arc::new(handler)))
    }

    pub fn delete<H>(&mut self, pattern: &str, filters: &str, handler: H) -> Result<&mut Self, ConfigurationError>
    where
        H: Handler<Reply> + 'static,
    {
        self.push(pattern, with_builtin(IS_DELETE, filters), PendingTarget::Handler(Arc::new(handler)))
    }

    pub fn ajax<H>(&mut self, pattern: &str, filters: &str, handler: H) -> Result<&mut Self, ConfigurationError>
    where
        H: Handler<Reply> + 'static,
    {
        self.push(pattern, with_builtin(IS_AJAX, filters), PendingTarget::Handler(Arc::new(handler)))
    }

    /// Mount `app` under `pattern`; it receives the path with the prefix replaced by `/`.
    pub fn mount(&mut self, pattern: &str, filters: &str, app: RouterBuilder) -> Result<&mut Self, ConfigurationError> {
        self.push(pattern, filters.to_string(), PendingTarget::Mount(app))
    }

    fn push(&mut self, pattern: &str, expression: String, target: PendingTarget) -> Result<&mut Self, ConfigurationError> {
        let full = format!("{}{}", self.base_path, pattern.trim().trim_start_matches('/'));
        let pattern = PathPattern::compile(&full, matches!(target, PendingTarget::Mount(_)))?;
        self.routes.push(PendingRoute {
            pattern,
            expression,
            target,
        });
        Ok(self)
    }

    /// Resolve every filter expression in the tree and freeze it.
    pub fn build(self) -> Result<Router, ConfigurationError> {
        let root = Inherited::default();
        let router = self.build_within(&root)?;
        tracing::debug!(routes = router.routes.len(), "Router built");
        Ok(router)
    }

    fn build_within(self, parent: &Inherited) -> Result<Router, ConfigurationError> {
        let RouterBuilder {
            base_path: _,
            mut store,
            renderer,
            filters,
            routes: pending,
        } = self;

        for (key, value) in &parent.store {
            store.entry(key.clone()).or_insert_with(|| value.clone());
        }
        let scope = Inherited {
            filters: filters.resolve(&parent.filters)?,
            store,
            renderer: renderer.or_else(|| parent.renderer.clone()),
        };

        let mut routes = Vec::with_capacity(pending.len());
        for route in pending {
            let chain = FilterChain::resolve(&route.expression, &scope.filters)?;
            let target = match route.target {
                PendingTarget::Handler(handler) => Target::Handler(handler),
                PendingTarget::Mount(app) => Target::Mount(app.build_within(&scope)?),
            };
            routes.push(Route {
                pattern: route.pattern,
                chain,
                target,
            });
        }

        Ok(Router {
            routes,
            store: scope.store,
            renderer: scope.renderer,
        })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new("/")
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("base_path", &self.base_path)
            .field("filters", &self.filters)
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

fn with_builtin(builtin: &str, filters: &str) -> String {
    format!("{builtin} {filters}").trim().to_string()
}

/// What a router passes down to the routers mounted on it.
#[derive(Default)]
struct Inherited {
    filters: FilterSet,
    store: Map,
    renderer: Option<Arc<dyn Renderer>>,
}

enum Target {
    Handler(Arc<dyn Handler<Reply>>),
    Mount(Router),
}

struct Route {
    pattern: PathPattern,
    chain: FilterChain,
    target: Target,
}

/// Immutable routing tree. Cheap to share behind an `Arc` across requests.
pub struct Router {
    routes: Vec<Route>,
    store: Map,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Router {
    /// Dispatch `path` with the request's raw sources.
    pub fn dispatch(&self, path: &str, sources: &RequestSources) -> Result<MatchOutcome, DispatchError> {
        let start = Instant::now();
        let outcome = self.run(path, sources, &Map::new(), &FilterResults::default());

        let label = match &outcome {
            Ok(MatchOutcome::Matched(_)) => "matched",
            Ok(MatchOutcome::NoMatch) => {
                tracing::debug!(path = %path, "No route matched");
                "no_match"
            }
            Err(_) => "error",
        };
        metrics::record_dispatch(label, start);
        outcome
    }

    /// Effective shared store of this router (own entries over inherited ones).
    pub fn store(&self) -> &Map {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn run(
        &self,
        path: &str,
        sources: &RequestSources,
        inherited: &Map,
        results: &FilterResults,
    ) -> Result<MatchOutcome, DispatchError> {
        for route in &self.routes {
            let Some(matched) = route.pattern.matches(path) else {
                continue;
            };

            let mut params = inherited.clone();
            params.extend(matched.params);

            let scope = Scope {
                sources,
                params: &params,
                store: &self.store,
                renderer: self.renderer.as_deref(),
            };
            let mut attempt = results.clone();
            if !route.chain.evaluate(&scope, &mut attempt)? {
                continue;
            }

            match &route.target {
                Target::Mount(app) => {
                    let remainder = matched.remainder.as_deref().unwrap_or("/");
                    match app.run(remainder, sources, &params, &attempt)? {
                        MatchOutcome::NoMatch => {
                            tracing::debug!(
                                mount = %route.pattern,
                                remainder = %remainder,
                                "Mounted router found no route, continuing"
                            );
                        }
                        outcome => return Ok(outcome),
                    }
                }
                Target::Handler(handler) => {
                    tracing::debug!(route = %route.pattern, path = %path, "Route matched");
                    let reply = scope
                        .invoke(handler.as_ref(), &attempt)
                        .map_err(|source| DispatchError::Handler {
                            route: route.pattern.to_string(),
                            source,
                        })?;
                    return Ok(MatchOutcome::Matched(reply));
                }
            }
        }

        Ok(MatchOutcome::NoMatch)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for route in &self.routes {
            match &route.target {
                Target::Handler(_) => list.entry(&format_args!("{} [{}]", route.pattern, route.chain.expression())),
                Target::Mount(app) => list.entry(&format_args!(
                    "{} [{}] => {:?}",
                    route.pattern,
                    route.chain.expression(),
                    app
                )),
            };
        }
        list.finish()
    }
}
