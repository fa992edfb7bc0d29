//! Route pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile `/users/<id>/` style patterns into anchored regexes
//! - Extract named captures as route params
//! - Compute the remainder path handed to a mounted router
//!
//! # Design Decisions
//! - Literal text is escaped and matched case-insensitively
//! - Trailing slash is optional on both pattern and path
//! - Full patterns anchor at end of input; prefix patterns stop at a
//!   segment boundary (`/` or end of input)
//! - Compiled once at build time, never at request time

use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::dispatch::Map;
use crate::error::ConfigurationError;

/// Characters a placeholder captures.
const CAPTURE_CLASS: &str = "[A-Za-z0-9_-]+";

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    prefix: bool,
}

/// Outcome of a successful match.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch {
    /// Named captures.
    pub params: Map,
    /// For prefix patterns, the path with the matched prefix replaced by `/`.
    pub remainder: Option<String>,
}

/// Normalize a base path to start and end with exactly one `/`.
pub fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        format!("{trimmed}/")
    } else {
        format!("/{trimmed}/")
    }
}

impl PathPattern {
    /// Compile `pattern`. With `prefix` set the pattern only has to match the
    /// start of a path (mount points).
    pub fn compile(pattern: &str, prefix: bool) -> Result<Self, ConfigurationError> {
        let source = pattern.trim();
        let mut expr = String::with_capacity(source.len() * 2 + 16);
        expr.push_str("(?i)^");

        let mut rest = source.trim_end_matches('/');
        while let Some(start) = rest.find('<') {
            let (literal, tail) = rest.split_at(start);
            expr.push_str(&regex::escape(literal));

            match placeholder(tail) {
                Some((name, len)) => {
                    expr.push_str(&format!("(?P<{name}>{CAPTURE_CLASS})"));
                    rest = &tail[len..];
                }
                None => {
                    expr.push('<');
                    rest = &tail[1..];
                }
            }
        }
        expr.push_str(&regex::escape(rest));
        expr.push_str(if prefix { "(?:/|$)" } else { "/?$" });

        let regex = Regex::new(&expr).map_err(|source| ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            source: source.to_string(),
            regex,
            prefix,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    /// Match `path`, returning the captures (and remainder for prefixes).
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let captures = self.regex.captures(path)?;

        let mut params = Map::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(value) = captures.name(name) {
                params.insert(name.to_string(), Value::String(value.as_str().to_string()));
            }
        }

        let remainder = if self.prefix {
            let end = captures.get(0).map_or(0, |whole| whole.end());
            Some(format!("/{}", &path[end..]))
        } else {
            None
        };

        Some(PathMatch { params, remainder })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse `<name>` at the start of `tail`; returns the name and consumed length.
fn placeholder(tail: &str) -> Option<(&str, usize)> {
    let end = tail.find('>')?;
    let name = &tail[1..end];
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some((name, end + 1))
}
