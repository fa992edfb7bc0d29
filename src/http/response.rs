//! Reply to HTTP response mapping.
//!
//! - `Empty` → `200` with no body
//! - `Text` / `Html` / `Json` → `200` with the matching content type
//! - `Redirect` → `302 Found` with `Location`
//! - no match → `404`, dispatch failure → `500`

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use crate::dispatch::Reply;

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Empty => StatusCode::OK.into_response(),
            Reply::Text(body) => body.into_response(),
            Reply::Html(body) => Html(body).into_response(),
            Reply::Json(value) => Json(value).into_response(),
            Reply::Redirect(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        }
    }
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

pub fn bad_request(reason: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, reason).into_response()
}
