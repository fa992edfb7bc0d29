//! Named filters and their dependency graph.
//!
//! # Responsibilities
//! - Register named predicates per router (build time)
//! - Resolve dependency lists into shared `Filter` nodes
//! - Detect unknown names and dependency cycles before serving
//!
//! # Design Decisions
//! - Names are case-insensitive (stored lowercase) and whitespace-free
//! - Duplicate names are rejected within one registry; a mounted router may
//!   shadow a name its ancestors define
//! - Dependencies resolve in the scope of the router that registered the filter
//! - Every resolved filter gets a process-unique id; memoized results are keyed
//!   by it, so a shadowing filter never reuses its ancestor's value

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::Handler;
use crate::error::ConfigurationError;
use crate::routing::builtin;
use crate::routing::chain::{tokenize, Token};

static NEXT_FILTER_ID: AtomicUsize = AtomicUsize::new(0);

/// A filter as registered, before its dependencies are resolved.
struct FilterDef {
    name: String,
    depends_on: Vec<Token>,
    predicate: Arc<dyn Handler<Value>>,
}

/// Build-time filter registry of one router.
#[derive(Default)]
pub struct FilterRegistry {
    defs: Vec<FilterDef>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in filters.
    pub(crate) fn with_builtins() -> Self {
        let defs = builtin::builtin_filters()
            .into_iter()
            .map(|(name, predicate)| FilterDef {
                name: name.to_string(),
                depends_on: Vec::new(),
                predicate,
            })
            .collect();
        Self { defs }
    }

    /// Register `name`. `depends_on` entries are filter names, optionally
    /// prefixed with `!`, evaluated (in order) before this filter.
    pub fn register<H>(&mut self, name: &str, depends_on: &[&str], predicate: H) -> Result<(), ConfigurationError>
    where
        H: Handler<Value> + 'static,
    {
        self.insert(name, depends_on, Arc::new(predicate))
    }

    fn insert(
        &mut self,
        name: &str,
        depends_on: &[&str],
        predicate: Arc<dyn Handler<Value>>,
    ) -> Result<(), ConfigurationError> {
        if name.is_empty() || name.starts_with('!') || name.chars().any(char::is_whitespace) {
            return Err(ConfigurationError::InvalidFilterName(name.to_string()));
        }

        let name = name.to_lowercase();
        if self.contains(&name) {
            return Err(ConfigurationError::DuplicateFilter(name));
        }

        let depends_on = tokenize(&depends_on.join(" "));
        self.defs.push(FilterDef {
            name,
            depends_on,
            predicate,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.defs.iter().any(|def| def.name == name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Resolve every registered filter on top of the inherited set.
    pub fn resolve(&self, inherited: &FilterSet) -> Result<FilterSet, ConfigurationError> {
        let mut resolver = Resolver {
            own: self.defs.iter().map(|def| (def.name.as_str(), def)).collect(),
            inherited,
            resolved: HashMap::new(),
            visiting: Vec::new(),
        };

        for def in &self.defs {
            resolver.resolve(&def.name, &def.name)?;
        }

        let mut filters = inherited.filters.clone();
        filters.extend(resolver.resolved);
        Ok(FilterSet { filters })
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.defs.iter().map(|def| &def.name)).finish()
    }
}

struct Resolver<'a> {
    own: HashMap<&'a str, &'a FilterDef>,
    inherited: &'a FilterSet,
    resolved: HashMap<String, Arc<Filter>>,
    visiting: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str, expression: &str) -> Result<Arc<Filter>, ConfigurationError> {
        if let Some(filter) = self.resolved.get(name) {
            return Ok(filter.clone());
        }

        let Some(def) = self.own.get(name).copied() else {
            return self.inherited.get(name).ok_or_else(|| ConfigurationError::UnknownFilter {
                name: name.to_string(),
                expression: expression.to_string(),
            });
        };

        if let Some(start) = self.visiting.iter().position(|n| n == name) {
            let mut cycle = self.visiting[start..].to_vec();
            cycle.push(name.to_string());
            return Err(ConfigurationError::FilterCycle(cycle));
        }

        self.visiting.push(name.to_string());
        let mut depends_on = Vec::with_capacity(def.depends_on.len());
        for token in &def.depends_on {
            let filter = self.resolve(&token.name, &def.name)?;
            depends_on.push(FilterRef::new(filter, token.negated));
        }
        self.visiting.pop();

        let filter = Arc::new(Filter {
            id: NEXT_FILTER_ID.fetch_add(1, Ordering::Relaxed),
            name: def.name.clone(),
            predicate: def.predicate.clone(),
            depends_on,
        });
        self.resolved.insert(def.name.clone(), filter.clone());
        Ok(filter)
    }
}

/// A resolved filter: predicate plus its dependencies, in order.
pub struct Filter {
    id: usize,
    name: String,
    predicate: Arc<dyn Handler<Value>>,
    depends_on: Vec<FilterRef>,
}

impl Filter {
    /// Identity of this resolved filter, distinct from any filter it shadows.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicate(&self) -> &dyn Handler<Value> {
        self.predicate.as_ref()
    }

    pub fn depends_on(&self) -> &[FilterRef] {
        &self.depends_on
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

/// A use of a filter, possibly negated.
#[derive(Clone)]
pub struct FilterRef {
    filter: Arc<Filter>,
    negated: bool,
}

impl FilterRef {
    pub fn new(filter: Arc<Filter>, negated: bool) -> Self {
        Self { filter, negated }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn name(&self) -> &str {
        self.filter.name()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

impl fmt::Debug for FilterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.filter.name)
        } else {
            f.write_str(&self.filter.name)
        }
    }
}

/// Effective filters of one router scope (own filters shadow inherited ones).
#[derive(Clone, Default)]
pub struct FilterSet {
    filters: HashMap<String, Arc<Filter>>,
}

impl FilterSet {
    pub fn get(&self, name: &str) -> Option<Arc<Filter>> {
        self.filters.get(&name.to_lowercase()).cloned()
    }

    /// Look up every token of `expression`.
    pub fn resolve(&self, expression: &str) -> Result<Vec<FilterRef>, ConfigurationError> {
        tokenize(expression)
            .into_iter()
            .map(|token| {
                let filter = self.get(&token.name).ok_or_else(|| ConfigurationError::UnknownFilter {
                    name: token.name.clone(),
                    expression: expression.to_string(),
                })?;
                Ok(FilterRef::new(filter, token.negated))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.filters.keys().collect();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}
