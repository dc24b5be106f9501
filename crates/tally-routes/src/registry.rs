//! The process-wide route registry.
//!
//! Feature modules register their endpoints into a [`RouteTable`] during
//! boot; [`RouteTable::freeze`] then produces the immutable [`Registry`]
//! the transport layer dispatches from. Nothing mutates the registry or
//! the documentation catalogue after the freeze.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use http::{Method, StatusCode};
use serde_json::Value;

use tally_core::{Arguments, Payload, Reply, Request};
use tally_docs::{Catalogue, RouteDocumentation};
use tally_pipeline::{BoxFuture, Dispatch};

use crate::builder::{route, Documentation};
use crate::muxer::{Endpoint, MethodMuxer};

/// A registration-time failure. All of these are boot fatal.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The same pattern was registered twice.
    #[error("pattern '{0}' registered twice")]
    DuplicatePattern(String),

    /// One muxer registered the same method twice.
    #[error("pattern '{pattern}' registers method {method} twice")]
    DuplicateMethod {
        /// The offending pattern.
        pattern: String,
        /// The method registered twice.
        method: Method,
    },

    /// A muxer with no method entries was registered.
    #[error("pattern '{0}' registered with no methods")]
    EmptyRegistration(String),
}

/// The mutable, boot-time collection of registrations.
pub struct RouteTable {
    endpoints: HashMap<String, Endpoint>,
    catalogue: Catalogue,
    docs_slot: Arc<OnceLock<Value>>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            catalogue: Catalogue::new(),
            docs_slot: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn insert(
        &mut self,
        pattern: &str,
        endpoint: Endpoint,
        docs: Vec<(Method, RouteDocumentation)>,
    ) -> Result<(), RegistryError> {
        if self.endpoints.contains_key(pattern) {
            return Err(RegistryError::DuplicatePattern(pattern.to_string()));
        }
        for (method, doc) in docs {
            self.catalogue.insert(pattern, &method, doc);
        }
        self.endpoints.insert(pattern.to_string(), endpoint);
        Ok(())
    }

    /// Registers the catalogue-serving route under `pattern`.
    ///
    /// The handler reads the snapshot rendered at freeze time, so serving
    /// the catalogue twice returns byte-identical results and can only
    /// fail if the table was never frozen. The route documents itself like
    /// any other registration. No authentication is attached.
    pub fn serve_docs(&mut self, pattern: &str) -> Result<(), RegistryError> {
        let slot = Arc::clone(&self.docs_slot);
        MethodMuxer::new()
            .get(
                route(move |_request: Request, _arguments: Arguments| {
                    let slot = Arc::clone(&slot);
                    async move {
                        match slot.get() {
                            Some(catalogue) => {
                                (StatusCode::OK, Payload::Data(catalogue.clone()))
                            }
                            None => (
                                StatusCode::INTERNAL_SERVER_ERROR,
                                Payload::error("documentation catalogue not initialized"),
                            ),
                        }
                    }
                })
                .with(Documentation {
                    summary: "get the api documentation",
                    description: "Responds with the documentation of every registered route.",
                }),
            )
            .register(self, pattern)
    }

    /// Freezes the table: renders the documentation catalogue once and
    /// returns the immutable registry.
    #[must_use]
    pub fn freeze(self) -> Registry {
        let rendered = self.catalogue.to_value();
        // The slot is written exactly once, here.
        let _ = self.docs_slot.set(rendered);
        Registry {
            endpoints: self.endpoints,
            catalogue: self.catalogue,
        }
    }
}

/// The immutable, post-boot registry. Shared across every connection via
/// `Arc`; never mutated again.
pub struct Registry {
    endpoints: HashMap<String, Endpoint>,
    catalogue: Catalogue,
}

impl Registry {
    /// The registered patterns, sorted, for boot logging.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        let mut patterns: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        patterns.sort_unstable();
        patterns
    }

    /// The frozen documentation catalogue.
    #[must_use]
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Dispatches one request by exact pattern match.
    ///
    /// An unknown pattern yields `404 {"error": "not found"}`; a known
    /// pattern with an unsupported method yields the muxer's 405. Anything
    /// else runs the registered chain.
    pub fn dispatch(&self, request: Request, arguments: Arguments) -> BoxFuture<Reply> {
        match self.endpoints.get(request.uri().path()) {
            Some(endpoint) => endpoint.dispatch(request, arguments),
            None => Box::pin(std::future::ready(Reply::error(
                StatusCode::NOT_FOUND,
                "not found",
            ))),
        }
    }

    /// Adapts the registry into a single dispatchable function, the root
    /// the server folds its process-global decorators around.
    #[must_use]
    pub fn into_dispatch(self: Arc<Self>) -> Dispatch {
        Arc::new(move |request, arguments| {
            let registry = Arc::clone(&self);
            Box::pin(async move { registry.dispatch(request, arguments).await })
        })
    }
}
