//! Filters every router starts with.
//!
//! - `is:ajax`: `X-Requested-With: XMLHttpRequest`
//! - `is:get`, `is:post`: request method
//! - `is:put`, `is:delete`: request method, or `POST` with a `_method` override

use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::{from_fn, Handler, RequestContext, RequestSources};
use crate::error::BoxError;

pub const IS_AJAX: &str = "is:ajax";
pub const IS_GET: &str = "is:get";
pub const IS_POST: &str = "is:post";
pub const IS_PUT: &str = "is:put";
pub const IS_DELETE: &str = "is:delete";

/// Built-in filters in registration order.
pub(crate) fn builtin_filters() -> Vec<(&'static str, Arc<dyn Handler<Value>>)> {
    vec![
        (IS_AJAX, predicate(|sources| sources.is_ajax())),
        (IS_GET, predicate(|sources| method_is(sources, "GET"))),
        (IS_POST, predicate(|sources| method_is(sources, "POST"))),
        (IS_PUT, predicate(|sources| method_or_override(sources, "PUT"))),
        (IS_DELETE, predicate(|sources| method_or_override(sources, "DELETE"))),
    ]
}

fn predicate(test: fn(&RequestSources) -> bool) -> Arc<dyn Handler<Value>> {
    Arc::new(from_fn(move |ctx: &RequestContext<'_>| -> Result<Value, BoxError> {
        Ok(Value::Bool(test(ctx.sources())))
    }))
}

fn method_is(sources: &RequestSources, method: &str) -> bool {
    sources.method().is_some_and(|m| m.eq_ignore_ascii_case(method))
}

fn method_or_override(sources: &RequestSources, method: &str) -> bool {
    method_is(sources, method)
        || (method_is(sources, "POST")
            && sources.method_override().is_some_and(|m| m.eq_ignore_ascii_case(method)))
}
