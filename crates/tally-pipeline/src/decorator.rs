//! The decorator contract and chain composition.
//!
//! A [`Dispatch`] is a fully composed, ready-to-invoke request handler: it
//! takes ownership of the request and the argument bag and resolves to a
//! reply. A [`Decorator`] wraps one `Dispatch` into another. Composition
//! happens once, at registration time, so the per-request path is a plain
//! chain of calls with no per-request allocation of the chain itself.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tally_core::{Arguments, HandlerResult, Reply, Request};
use tally_docs::RouteDocumentation;

/// A boxed future resolving to `T`.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A dispatchable function: the unit the whole pipeline is built from.
///
/// The request and the argument bag are moved in; ownership of the bag is
/// handed stage to stage down the chain, which is what keeps it exclusive
/// to one request's flow.
pub type Dispatch = Arc<dyn Fn(Request, Arguments) -> BoxFuture<Reply> + Send + Sync>;

/// A cross-cutting capability that wraps a dispatchable function.
///
/// Decorators are stateless with respect to individual requests (any
/// per-request state goes through the argument bag) but may carry
/// per-registration configuration: an accepted content-type list, a
/// required permission level.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tally_pipeline::{Decorator, Dispatch};
///
/// struct NoStore;
///
/// impl Decorator for NoStore {
///     fn name(&self) -> &'static str {
///         "no-store"
///     }
///
///     fn wrap(&self, next: Dispatch) -> Dispatch {
///         Arc::new(move |request, arguments| {
///             let next = Arc::clone(&next);
///             Box::pin(async move {
///                 let mut reply = next(request, arguments).await;
///                 reply
///                     .headers_mut()
///                     .insert("cache-control", "no-store".parse().expect("valid header"));
///                 reply
///             })
///         })
///     }
/// }
/// ```
pub trait Decorator: Send + Sync + 'static {
    /// The stage name, used in logs and tests.
    fn name(&self) -> &'static str;

    /// Wraps `next`, returning a new dispatchable function that may run
    /// logic before calling it, after it returns, or instead of calling it
    /// at all.
    fn wrap(&self, next: Dispatch) -> Dispatch;

    /// Contributes this decorator's contract to the route's documentation
    /// entry. Most decorators publish nothing.
    fn document(&self, _doc: &mut RouteDocumentation) {}
}

/// Adapts a base handler into a [`Dispatch`].
///
/// The handler contract is `(Request, Arguments) -> (StatusCode, Payload)`;
/// this adapter is the innermost link of every chain and turns that pair
/// into a [`Reply`] with empty headers for the decorators to fill in.
pub fn handler<H, F>(h: H) -> Dispatch
where
    H: Fn(Request, Arguments) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |request, arguments| {
        let fut = h(request, arguments);
        Box::pin(async move {
            let (status, payload) = fut.await;
            Reply::new(status, payload)
        })
    })
}

/// Folds `decorators` around `base`, innermost first.
///
/// The base handler is wrapped by the decorator nearest to it in the
/// declared list, and so on outward: the first decorator in the list ends
/// up outermost.
#[must_use]
pub fn compose(decorators: &[Arc<dyn Decorator>], base: Dispatch) -> Dispatch {
    decorators
        .iter()
        .rev()
        .fold(base, |next, decorator| decorator.wrap(next))
}
