//! Response helpers handed to handlers by name (`json`, `redirect`, `render`).

use serde::Serialize;
use serde_json::Value;

use crate::dispatch::Reply;
use crate::error::{BoxError, RenderError};

/// Template rendering collaborator.
///
/// The engine itself lives outside the router; a router (and every router
/// mounted below it) hands the configured instance to the `render` helper.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, vars: &Value) -> Result<String, BoxError>;
}

/// Builds JSON replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponder;

impl JsonResponder {
    pub fn respond<T: Serialize + ?Sized>(&self, data: &T) -> serde_json::Result<Reply> {
        Ok(Reply::Json(serde_json::to_value(data)?))
    }
}

/// Builds redirect replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Redirector;

impl Redirector {
    pub fn to(&self, location: impl Into<String>) -> Reply {
        Reply::Redirect(location.into())
    }
}

/// Renders templates through the router's [`Renderer`], if any.
#[derive(Clone, Copy)]
pub struct RenderHelper<'a> {
    renderer: Option<&'a dyn Renderer>,
}

impl<'a> RenderHelper<'a> {
    pub fn new(renderer: Option<&'a dyn Renderer>) -> Self {
        Self { renderer }
    }

    pub fn render(&self, template: &str, vars: &Value) -> Result<String, RenderError> {
        let renderer = self.renderer.ok_or(RenderError::NoRenderer)?;
        renderer
            .render(template, vars)
            .map_err(|source| RenderError::Template {
                template: template.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for RenderHelper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHelper")
            .field("configured", &self.renderer.is_some())
            .finish()
    }
}
