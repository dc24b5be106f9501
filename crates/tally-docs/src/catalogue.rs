//! The documentation catalogue.

use std::collections::BTreeMap;

use http::Method;
use serde_json::Value;

use crate::entry::RouteDocumentation;

/// The aggregated documentation of every registered route.
///
/// Entries are keyed by pattern, then by method. `BTreeMap` keeps the
/// rendering order deterministic, so serving the catalogue twice yields
/// byte-identical output. The catalogue is mutable only while routes are
/// being registered; freezing the route table renders it once and discards
/// write access.
#[derive(Debug, Default, Clone)]
pub struct Catalogue {
    entries: BTreeMap<String, BTreeMap<String, RouteDocumentation>>,
}

impl Catalogue {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the documentation entry for one (pattern, method).
    pub fn insert(&mut self, pattern: &str, method: &Method, entry: RouteDocumentation) {
        self.entries
            .entry(pattern.to_string())
            .or_default()
            .insert(method.as_str().to_string(), entry);
    }

    /// Returns the entry for a (pattern, method), if registered.
    #[must_use]
    pub fn get(&self, pattern: &str, method: &Method) -> Option<&RouteDocumentation> {
        self.entries.get(pattern)?.get(method.as_str())
    }

    /// Returns the number of documented (pattern, method) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the whole catalogue to the JSON value served by the
    /// documentation endpoint.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.entries).expect("serialize documentation catalogue")
    }
}
