//! Per-method route builders.

use std::future::Future;
use std::sync::Arc;

use tally_core::{Arguments, HandlerResult, Request};
use tally_docs::RouteDocumentation;
use tally_pipeline::{handler, Decorator, Dispatch};

/// One method's registration: a base handler and its ordered decorators.
///
/// Built with [`route`], extended with [`Route::with`], and consumed by
/// [`MethodMuxer::register`](crate::MethodMuxer::register), which folds the
/// decorators around the handler exactly once.
pub struct Route {
    base: Dispatch,
    decorators: Vec<Arc<dyn Decorator>>,
}

/// Starts a registration from a base handler.
pub fn route<H, F>(h: H) -> Route
where
    H: Fn(Request, Arguments) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    Route {
        base: handler(h),
        decorators: Vec::new(),
    }
}

impl Route {
    /// Appends a decorator. Declaration order is composition order: the
    /// first `with` is outermost among this route's own decorators.
    #[must_use]
    pub fn with(mut self, decorator: impl Decorator) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// Appends an already-shared decorator.
    #[must_use]
    pub fn with_arc(mut self, decorator: Arc<dyn Decorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub(crate) fn into_parts(self) -> (Dispatch, Vec<Arc<dyn Decorator>>) {
        (self.base, self.decorators)
    }
}

/// Human documentation attached at registration.
///
/// A pseudo-decorator: it does nothing at request time, but contributes
/// the summary and description to the route's catalogue entry. Attached at
/// the muxer level it documents the pattern; attached to a single method's
/// route it overrides for that method.
#[derive(Debug, Clone, Copy)]
pub struct Documentation {
    /// One-line summary.
    pub summary: &'static str,
    /// Longer description.
    pub description: &'static str,
}

impl Decorator for Documentation {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        next
    }

    fn document(&self, doc: &mut RouteDocumentation) {
        if !self.summary.is_empty() {
            doc.summary = self.summary.to_string();
        }
        if !self.description.is_empty() {
            doc.description = self.description.to_string();
        }
    }
}
