//! Request-scoped data handed to handlers and filter predicates.
//!
//! # Responsibilities
//! - Hold the raw sources supplied by the transport (form, query, server)
//! - Expose route params, shared store and filter results through accessors
//! - Accumulate filter results per dispatch attempt
//!
//! # Design Decisions
//! - Everything here is built fresh per request and never shared
//! - Accessor lookups by key are exact; lookups by parameter name are case-insensitive

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::dispatch::helpers::{JsonResponder, Redirector, RenderHelper, Renderer};
use crate::dispatch::{Handler, Reply};
use crate::error::{BoxError, RenderError};

/// String-keyed mapping used for every data source.
pub type Map = serde_json::Map<String, Value>;

/// Submitted-form field carrying the method override (`PUT`/`DELETE` over `POST`).
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Raw data sources supplied by the transport for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestSources {
    /// Submitted-form fields.
    pub post: Map,
    /// Query-string fields.
    pub query: Map,
    /// Server/environment fields (`REQUEST_METHOD`, `HTTP_*`, ...).
    pub server: Map,
}

impl RequestSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.post.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_server(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.server.insert(key.into(), value.into());
        self
    }

    /// The request method as reported by the transport.
    pub fn method(&self) -> Option<&str> {
        self.server.get("REQUEST_METHOD").and_then(Value::as_str)
    }

    /// The `_method` form field, if present.
    pub fn method_override(&self) -> Option<&str> {
        self.post.get(METHOD_OVERRIDE_FIELD).and_then(Value::as_str)
    }

    pub fn is_ajax(&self) -> bool {
        self.server.get("HTTP_X_REQUESTED_WITH").and_then(Value::as_str) == Some("XMLHttpRequest")
    }

    /// Path to dispatch: `REDIRECT_URL` when set, otherwise the path part of `REQUEST_URI`.
    pub fn request_path(&self) -> Option<String> {
        let redirect = self.server.get("REDIRECT_URL").and_then(Value::as_str);
        if let Some(url) = redirect.filter(|url| !url.is_empty()) {
            return Some(url.to_string());
        }

        let uri = self.server.get("REQUEST_URI").and_then(Value::as_str)?;
        let path = uri.split(['?', '#']).next().unwrap_or_default();
        Some(if path.is_empty() { "/".to_string() } else { path.to_string() })
    }
}

/// Read-only view over one mapping.
///
/// `all()` returns the whole mapping; `get`/`get_or` look up a single key.
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'a> {
    source: &'a Map,
}

impl<'a> Accessor<'a> {
    pub fn new(source: &'a Map) -> Self {
        Self { source }
    }

    pub fn all(&self) -> &'a Map {
        self.source
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.source.get(key)
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).cloned().unwrap_or_else(|| default.into())
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// Strip the characters a filter name may contain but a parameter name may not.
pub fn sanitize_key(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, ':' | ' ' | '/')).collect()
}

/// Values produced by filters during one dispatch.
#[derive(Debug, Clone, Default)]
pub struct FilterResults {
    /// Value per filter name as seen by the route (negation applied).
    values: Map,
    /// Raw predicate output per filter id, reused instead of re-invoking.
    /// Keyed by identity so a shadowing filter never sees its ancestor's output.
    raw: HashMap<usize, Value>,
}

impl FilterResults {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Map {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn memoized(&self, id: usize) -> Option<&Value> {
        self.raw.get(&id)
    }

    pub(crate) fn record(&mut self, id: usize, name: &str, raw: Value, value: Value) {
        self.raw.insert(id, raw);
        self.values.insert(name.to_string(), value);
    }

    /// Results keyed by sanitized name, plus the short form of namespaced
    /// names (`is:auth` is also reachable as `auth`) where that key is free.
    pub fn sanitized(&self) -> Map {
        let mut table: Map = self
            .values
            .iter()
            .map(|(name, value)| (sanitize_key(name), value.clone()))
            .collect();

        for (name, value) in &self.values {
            if let Some((_, short)) = name.rsplit_once(':') {
                let short = sanitize_key(short);
                if !short.is_empty() && !table.contains_key(&short) {
                    table.insert(short, value.clone());
                }
            }
        }
        table
    }
}

/// Everything a dispatch attempt can see, minus the filter results which
/// change as the chain runs.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub sources: &'a RequestSources,
    pub params: &'a Map,
    pub store: &'a Map,
    pub renderer: Option<&'a dyn Renderer>,
}

impl<'a> Scope<'a> {
    pub fn context(&self, results: &FilterResults) -> RequestContext<'a> {
        RequestContext::new(self.sources, self.params, self.store, results, self.renderer)
    }

    /// Call a handler or predicate against this scope.
    pub fn invoke<T>(&self, handler: &dyn Handler<T>, results: &FilterResults) -> Result<T, BoxError> {
        let ctx = self.context(results);
        handler.call(&ctx)
    }
}

/// Typed view of the request handed to every handler and predicate.
pub struct RequestContext<'a> {
    sources: &'a RequestSources,
    post: Map,
    params: &'a Map,
    store: &'a Map,
    filters: Map,
    renderer: Option<&'a dyn Renderer>,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        sources: &'a RequestSources,
        params: &'a Map,
        store: &'a Map,
        results: &FilterResults,
        renderer: Option<&'a dyn Renderer>,
    ) -> Self {
        let mut post = sources.post.clone();
        post.remove(METHOD_OVERRIDE_FIELD);

        Self {
            sources,
            post,
            params,
            store,
            filters: results.sanitized(),
            renderer,
        }
    }

    pub fn sources(&self) -> &'a RequestSources {
        self.sources
    }

    /// Submitted-form fields, without the method override field.
    pub fn post(&self) -> Accessor<'_> {
        Accessor::new(&self.post)
    }

    pub fn query(&self) -> Accessor<'a> {
        Accessor::new(&self.sources.query)
    }

    /// Named captures of the matched route (and of every mount above it).
    pub fn param(&self) -> Accessor<'a> {
        Accessor::new(self.params)
    }

    pub fn server(&self) -> Accessor<'a> {
        Accessor::new(&self.sources.server)
    }

    pub fn store(&self) -> Accessor<'a> {
        Accessor::new(self.store)
    }

    /// Filter results keyed by sanitized name.
    pub fn filter(&self) -> Accessor<'_> {
        Accessor::new(&self.filters)
    }

    pub fn ajax(&self) -> bool {
        self.sources.is_ajax()
    }

    pub fn json<T: Serialize + ?Sized>(&self, data: &T) -> serde_json::Result<Reply> {
        JsonResponder.respond(data)
    }

    pub fn redirect(&self, location: impl Into<String>) -> Reply {
        Redirector.to(location)
    }

    pub fn render(&self, template: &str, vars: &Value) -> Result<String, RenderError> {
        RenderHelper::new(self.renderer).render(template, vars)
    }

    pub(crate) fn renderer(&self) -> Option<&'a dyn Renderer> {
        self.renderer
    }

    /// Look a name up in route params, then store, then filter results.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        find_ignore_case(self.params, name)
            .or_else(|| find_ignore_case(self.store, name))
            .or_else(|| find_ignore_case(&self.filters, name))
    }
}

fn find_ignore_case<'m>(map: &'m Map, name: &str) -> Option<&'m Value> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}
