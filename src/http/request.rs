//! Request translation into routing sources.
//!
//! # Responsibilities
//! - Build the server fields (`REQUEST_METHOD`, `REQUEST_URI`, `HTTP_*`, ...)
//! - Parse the query string and submitted form into string maps
//! - Enforce the body size limit before anything is parsed
//!
//! # Design Decisions
//! - Header names follow the CGI convention: `X-Requested-With` becomes
//!   `HTTP_X_REQUESTED_WITH`; repeated headers are joined with `, `
//! - Form and top-level JSON object bodies both feed the post source;
//!   anything else leaves it empty
//! - Repeated query or form keys: last one wins

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::{Map, RequestSources};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
}

/// Consume a request and produce the raw sources the router reads.
pub async fn extract_sources(request: Request<Body>, max_body_bytes: usize) -> Result<RequestSources, RequestError> {
    let (parts, body) = request.into_parts();

    let mut server = Map::new();
    server.insert("REQUEST_METHOD".into(), parts.method.as_str().into());
    let request_uri = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    server.insert("REQUEST_URI".into(), request_uri.into());
    server.insert("QUERY_STRING".into(), parts.uri.query().unwrap_or_default().into());
    server.insert("SERVER_PROTOCOL".into(), format!("{:?}", parts.version).into());
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        server.insert("REMOTE_ADDR".into(), addr.ip().to_string().into());
    }
    server.extend(header_fields(&parts.headers));

    let query = parts.uri.query().map(parse_form).unwrap_or_default();

    let bytes = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(RequestError::Body)?;
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let post = parse_body(content_type, &bytes);

    Ok(RequestSources { post, query, server })
}

/// `HTTP_*` fields, plus the CGI `CONTENT_TYPE` / `CONTENT_LENGTH`.
fn header_fields(headers: &HeaderMap) -> Map {
    let mut fields = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");

        let key = name.as_str().to_ascii_uppercase().replace('-', "_");
        if key == "CONTENT_TYPE" || key == "CONTENT_LENGTH" {
            fields.insert(key.clone(), Value::String(joined.clone()));
        }
        fields.insert(format!("HTTP_{key}"), Value::String(joined));
    }
    fields
}

fn parse_form(input: &str) -> Map {
    url::form_urlencoded::parse(input.as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

fn parse_body(content_type: &str, bytes: &[u8]) -> Map {
    if bytes.is_empty() {
        return Map::new();
    }

    let mime = content_type.split(';').next().unwrap_or_default().trim();
    if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        return url::form_urlencoded::parse(bytes)
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();
    }
    if mime.eq_ignore_ascii_case("application/json") {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => return fields,
            Ok(_) => tracing::debug!("JSON body is not an object, post data left empty"),
            Err(e) => tracing::debug!(error = %e, "Malformed JSON body, post data left empty"),
        }
    }
    Map::new()
}
