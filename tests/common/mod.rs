//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use waypoint::dispatch::Renderer;
use waypoint::{from_fn, BoxError, Handler, Reply, RequestSources};

/// Sources for a request with the given method and URI.
pub fn request(method: &str, uri: &str) -> RequestSources {
    RequestSources::new()
        .with_server("REQUEST_METHOD", method)
        .with_server("REQUEST_URI", uri)
}

pub fn get(uri: &str) -> RequestSources {
    request("GET", uri)
}

/// Handler replying with fixed text.
pub fn text(body: &'static str) -> impl Handler<Reply> {
    from_fn(move |_ctx| Ok(Reply::text(body)))
}

/// Predicate returning a fixed value.
pub fn constant(value: Value) -> impl Handler<Value> {
    from_fn(move |_ctx| -> Result<Value, BoxError> { Ok(value.clone()) })
}

/// Predicate returning a fixed value and counting its invocations.
pub fn counted(value: Value) -> (impl Handler<Value>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handler = from_fn(move |_ctx| -> Result<Value, BoxError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value.clone())
    });
    (handler, calls)
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Replaces `{key}` with the matching top-level string of `vars`.
pub struct BraceRenderer;

impl Renderer for BraceRenderer {
    fn render(&self, template: &str, vars: &Value) -> Result<String, BoxError> {
        let mut out = template.to_string();
        if let Value::Object(fields) = vars {
            for (key, value) in fields {
                let value = value.as_str().ok_or_else(|| format!("{key} is not a string"))?;
                out = out.replace(&format!("{{{key}}}"), value);
            }
        }
        Ok(out)
    }
}
