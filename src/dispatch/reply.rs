//! Handler replies.

use serde_json::Value;

/// What a route handler hands back to the transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    /// Nothing to send beyond a success status.
    #[default]
    Empty,
    /// Plain text body.
    Text(String),
    /// HTML body, usually produced by the render helper.
    Html(String),
    /// JSON body.
    Json(Value),
    /// Temporary redirect to the given location.
    Redirect(String),
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Text(body.into())
    }

    pub fn html(body: impl Into<String>) -> Self {
        Reply::Html(body.into())
    }

    pub fn json(value: impl Into<Value>) -> Self {
        Reply::Json(value.into())
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Reply::Redirect(location.into())
    }
}
