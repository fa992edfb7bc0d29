//! Handler interface and named-parameter binding.
//!
//! Every route target and filter predicate is a [`Handler`]. Most are written
//! as closures over the [`RequestContext`] through [`from_fn`]. [`bind`] adds
//! the by-name convenience: the handler declares which request data it wants
//! as a list of parameter names, checked once when the handler is built.

use std::ops::Index;

use serde_json::Value;

use crate::dispatch::context::{Accessor, RequestContext};
use crate::dispatch::helpers::{JsonResponder, Redirector, RenderHelper};
use crate::error::{BoxError, ConfigurationError};

/// Something that can serve a request given its context.
pub trait Handler<T>: Send + Sync {
    fn call(&self, ctx: &RequestContext<'_>) -> Result<T, BoxError>;
}

/// Handler backed by a closure over the context.
pub struct FnHandler<F> {
    f: F,
}

/// Wrap a closure taking the [`RequestContext`].
pub fn from_fn<T, F>(f: F) -> FnHandler<F>
where
    F: Fn(&RequestContext<'_>) -> Result<T, BoxError> + Send + Sync,
{
    FnHandler { f }
}

impl<T, F> Handler<T> for FnHandler<F>
where
    F: Fn(&RequestContext<'_>) -> Result<T, BoxError> + Send + Sync,
{
    fn call(&self, ctx: &RequestContext<'_>) -> Result<T, BoxError> {
        (self.f)(ctx)
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Where a named parameter gets its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Post,
    Query,
    Param,
    Server,
    Store,
    Filter,
    Ajax,
    Json,
    Redirect,
    Render,
    /// Route params, then store, then filter results.
    Lookup(String),
}

impl Binding {
    /// Resolve a parameter name. Reserved names are matched case-insensitively.
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        if !is_identifier(name) {
            return Err(ConfigurationError::UninvocableTarget {
                parameter: name.to_string(),
                reason: "not an identifier",
            });
        }

        let binding = match name.to_ascii_lowercase().as_str() {
            "post" => Binding::Post,
            "get" => Binding::Query,
            "param" => Binding::Param,
            "server" => Binding::Server,
            "store" => Binding::Store,
            "filter" => Binding::Filter,
            "ajax" => Binding::Ajax,
            "json" => Binding::Json,
            "redirect" => Binding::Redirect,
            "render" => Binding::Render,
            other => Binding::Lookup(other.to_string()),
        };
        Ok(binding)
    }

    fn resolve<'c>(&self, ctx: &'c RequestContext<'_>) -> Arg<'c> {
        match self {
            Binding::Post => Arg::Source(ctx.post()),
            Binding::Query => Arg::Source(ctx.query()),
            Binding::Param => Arg::Source(ctx.param()),
            Binding::Server => Arg::Source(ctx.server()),
            Binding::Store => Arg::Source(ctx.store()),
            Binding::Filter => Arg::Source(ctx.filter()),
            Binding::Ajax => Arg::Ajax(ctx.ajax()),
            Binding::Json => Arg::Json(JsonResponder),
            Binding::Redirect => Arg::Redirect(Redirector),
            Binding::Render => Arg::Render(RenderHelper::new(ctx.renderer())),
            Binding::Lookup(name) => Arg::Value(ctx.lookup(name)),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// One resolved parameter.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Source(Accessor<'a>),
    Ajax(bool),
    Json(JsonResponder),
    Redirect(Redirector),
    Render(RenderHelper<'a>),
    Value(Option<&'a Value>),
}

impl<'a> Arg<'a> {
    pub fn accessor(&self) -> Option<Accessor<'a>> {
        match self {
            Arg::Source(accessor) => Some(*accessor),
            _ => None,
        }
    }

    /// The looked-up value; `None` when absent or when this is not a lookup.
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Arg::Value(value) => *value,
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value().and_then(Value::as_str)
    }

    pub fn flag(&self) -> Option<bool> {
        match self {
            Arg::Ajax(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<JsonResponder> {
        match self {
            Arg::Json(json) => Some(*json),
            _ => None,
        }
    }

    pub fn redirect(&self) -> Option<Redirector> {
        match self {
            Arg::Redirect(redirect) => Some(*redirect),
            _ => None,
        }
    }

    pub fn render(&self) -> Option<RenderHelper<'a>> {
        match self {
            Arg::Render(render) => Some(*render),
            _ => None,
        }
    }
}

/// Parameters in declaration order.
#[derive(Debug)]
pub struct Args<'a> {
    args: Vec<Arg<'a>>,
}

impl<'a> Args<'a> {
    pub fn resolve(bindings: &[Binding], ctx: &'a RequestContext<'_>) -> Self {
        Self {
            args: bindings.iter().map(|binding| binding.resolve(ctx)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg<'a>> {
        self.args.iter()
    }
}

impl<'a> Index<usize> for Args<'a> {
    type Output = Arg<'a>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.args[index]
    }
}

/// Handler with a declared parameter manifest.
pub struct Bound<F> {
    bindings: Vec<Binding>,
    f: F,
}

/// Build a handler that receives the named parameters positionally.
///
/// ```ignore
/// let show = bind(&["id", "json"], |args| {
///     let id = args[0].as_str().unwrap_or_default();
///     Ok(args[1].json().unwrap_or_default().respond(&id)?)
/// })?;
/// ```
pub fn bind<T, F>(params: &[&str], f: F) -> Result<Bound<F>, ConfigurationError>
where
    F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync,
{
    let mut bindings = Vec::with_capacity(params.len());
    let mut seen: Vec<String> = Vec::with_capacity(params.len());

    for name in params {
        let binding = Binding::parse(name)?;
        let folded = name.to_ascii_lowercase();
        if seen.contains(&folded) {
            return Err(ConfigurationError::UninvocableTarget {
                parameter: name.to_string(),
                reason: "declared twice",
            });
        }
        seen.push(folded);
        bindings.push(binding);
    }

    Ok(Bound { bindings, f })
}

impl<F> Bound<F> {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

impl<T, F> Handler<T> for Bound<F>
where
    F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync,
{
    fn call(&self, ctx: &RequestContext<'_>) -> Result<T, BoxError> {
        let args = Args::resolve(&self.bindings, ctx);
        (self.f)(&args)
    }
}

impl<F> std::fmt::Debug for Bound<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bound")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}
