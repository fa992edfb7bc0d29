//! Filter expressions and their evaluation.
//!
//! # Responsibilities
//! - Parse `"is:logged !is:ajax custom"` into an ordered list of filter uses
//! - Evaluate dependencies depth-first, then the filter itself
//! - Short-circuit on the first falsy result
//! - Commit produced values only when the whole chain passes
//!
//! # Design Decisions
//! - Tokens are whitespace separated; order of first occurrence is evaluation order
//! - Results are values, not booleans: a login filter may hand back the user
//! - A predicate's raw output is memoized per attempt by filter identity, so
//!   shared dependencies (and filters already passed by an enclosing router)
//!   run once, while a filter shadowing an ancestor's name still runs its own
//! - A predicate error aborts the dispatch; a falsy value only rejects the route

use serde_json::Value;

use crate::dispatch::{FilterResults, Scope};
use crate::error::{ConfigurationError, DispatchError};
use crate::routing::filter::{FilterRef, FilterSet};

/// One `[!]name` token of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) name: String,
    pub(crate) negated: bool,
}

/// Split an expression into lowercase tokens, keeping the first occurrence of each name.
pub(crate) fn tokenize(expression: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    for raw in expression.split_whitespace() {
        let (negated, name) = match raw.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        if name.is_empty() {
            continue;
        }

        let name = name.to_lowercase();
        if tokens.iter().all(|token| token.name != name) {
            tokens.push(Token { name, negated });
        }
    }
    tokens
}

/// Falsy: `null`, `false`, zero, `""`, `[]`, `{}`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// A route's resolved filter expression.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    expression: String,
    entries: Vec<FilterRef>,
}

impl FilterChain {
    pub fn resolve(expression: &str, filters: &FilterSet) -> Result<Self, ConfigurationError> {
        Ok(Self {
            expression: expression.trim().to_string(),
            entries: filters.resolve(expression)?,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn entries(&self) -> &[FilterRef] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the chain. On success the produced values are merged into `results`;
    /// on rejection `results` is left untouched.
    pub fn evaluate(&self, scope: &Scope<'_>, results: &mut FilterResults) -> Result<bool, DispatchError> {
        if self.entries.is_empty() {
            return Ok(true);
        }

        let mut pending = results.clone();
        for entry in &self.entries {
            if !evaluate_entry(entry, scope, &mut pending)? {
                tracing::debug!(
                    filter = %entry.name(),
                    expression = %self.expression,
                    "Filter rejected route"
                );
                return Ok(false);
            }
        }

        *results = pending;
        Ok(true)
    }
}

fn evaluate_entry(entry: &FilterRef, scope: &Scope<'_>, pending: &mut FilterResults) -> Result<bool, DispatchError> {
    let filter = entry.filter();

    let raw = match pending.memoized(filter.id()).cloned() {
        Some(raw) => raw,
        None => {
            for dependency in filter.depends_on() {
                if !evaluate_entry(dependency, scope, pending)? {
                    return Ok(false);
                }
            }
            scope
                .invoke(filter.predicate(), pending)
                .map_err(|source| DispatchError::Filter {
                    filter: filter.name().to_string(),
                    source,
                })?
        }
    };

    let value = if entry.is_negated() {
        Value::Bool(!is_truthy(&raw))
    } else {
        raw.clone()
    };
    let passed = is_truthy(&value);
    pending.record(filter.id(), filter.name(), raw, value);
    Ok(passed)
}
