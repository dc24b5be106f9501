//! Method-based dispatch for a single pattern.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};

use tally_core::{Arguments, Reply, Request};
use tally_docs::RouteDocumentation;
use tally_pipeline::{compose, BoxFuture, Decorator, Dispatch};

use crate::builder::Route;
use crate::registry::{RegistryError, RouteTable};

/// Maps HTTP methods to handler chains for one pattern.
///
/// Decorators attached with [`MethodMuxer::with`] are uniform: they fold
/// outside every per-method chain, so authentication and transaction setup
/// are declared once per resource instead of once per method. The uniform
/// list still sits *inside* the method check, so an unsupported method is
/// answered with the fixed 405 before any decorator runs.
#[derive(Default)]
pub struct MethodMuxer {
    entries: Vec<(Method, Route)>,
    uniform: Vec<Arc<dyn Decorator>>,
}

impl MethodMuxer {
    /// Creates an empty muxer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a chain for an arbitrary method.
    #[must_use]
    pub fn method(mut self, method: Method, route: Route) -> Self {
        self.entries.push((method, route));
        self
    }

    /// Registers the GET chain.
    #[must_use]
    pub fn get(self, route: Route) -> Self {
        self.method(Method::GET, route)
    }

    /// Registers the POST chain.
    #[must_use]
    pub fn post(self, route: Route) -> Self {
        self.method(Method::POST, route)
    }

    /// Registers the PUT chain.
    #[must_use]
    pub fn put(self, route: Route) -> Self {
        self.method(Method::PUT, route)
    }

    /// Registers the PATCH chain.
    #[must_use]
    pub fn patch(self, route: Route) -> Self {
        self.method(Method::PATCH, route)
    }

    /// Registers the DELETE chain.
    #[must_use]
    pub fn delete(self, route: Route) -> Self {
        self.method(Method::DELETE, route)
    }

    /// Appends a uniform decorator, folded outside every per-method chain.
    #[must_use]
    pub fn with(mut self, decorator: impl Decorator) -> Self {
        self.uniform.push(Arc::new(decorator));
        self
    }

    /// Appends an already-shared uniform decorator.
    #[must_use]
    pub fn with_arc(mut self, decorator: Arc<dyn Decorator>) -> Self {
        self.uniform.push(decorator);
        self
    }

    /// Composes every chain and registers the endpoint under `pattern`.
    pub fn register(self, table: &mut RouteTable, pattern: &str) -> Result<(), RegistryError> {
        let (endpoint, docs) = self.build(pattern)?;
        table.insert(pattern, endpoint, docs)
    }

    pub(crate) fn build(
        self,
        pattern: &str,
    ) -> Result<(Endpoint, Vec<(Method, RouteDocumentation)>), RegistryError> {
        if self.entries.is_empty() {
            return Err(RegistryError::EmptyRegistration(pattern.to_string()));
        }

        let mut methods = HashMap::new();
        let mut docs = Vec::new();

        for (method, route) in self.entries {
            let (base, route_decorators) = route.into_parts();

            let mut chain = self.uniform.clone();
            chain.extend(route_decorators);

            let mut doc = RouteDocumentation::new();
            for decorator in &chain {
                decorator.document(&mut doc);
            }

            let dispatch = compose(&chain, base);
            if methods.insert(method.clone(), dispatch).is_some() {
                return Err(RegistryError::DuplicateMethod {
                    pattern: pattern.to_string(),
                    method,
                });
            }
            docs.push((method, doc));
        }

        Ok((Endpoint::new(methods), docs))
    }
}

/// A registered pattern's dispatch table, one composed chain per method.
pub struct Endpoint {
    methods: HashMap<Method, Dispatch>,
    allow: String,
}

impl Endpoint {
    fn new(methods: HashMap<Method, Dispatch>) -> Self {
        let mut allowed: Vec<&str> = methods.keys().map(Method::as_str).collect();
        allowed.sort_unstable();
        let allow = allowed.join(", ");
        Self { methods, allow }
    }

    /// The methods this endpoint answers, for the `Allow` header.
    #[must_use]
    pub fn allow(&self) -> &str {
        &self.allow
    }

    /// Dispatches one request.
    ///
    /// A method with no registered chain yields the fixed
    /// `405 {"error": "method not allowed"}` without invoking anything;
    /// no decorator of this endpoint runs.
    pub fn dispatch(&self, request: Request, arguments: Arguments) -> BoxFuture<Reply> {
        match self.methods.get(request.method()) {
            Some(dispatch) => dispatch(request, arguments),
            None => {
                let mut reply = Reply::error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
                if let Ok(allow) = self.allow.parse() {
                    reply.headers_mut().insert(http::header::ALLOW, allow);
                }
                Box::pin(std::future::ready(reply))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::route;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tally_core::Payload;

    /// Counts how many times its wrapped stage actually runs.
    struct Counting {
        runs: Arc<AtomicUsize>,
    }

    impl Decorator for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn wrap(&self, next: Dispatch) -> Dispatch {
            let runs = Arc::clone(&self.runs);
            Arc::new(move |request, arguments| {
                runs.fetch_add(1, Ordering::SeqCst);
                next(request, arguments)
            })
        }
    }

    /// Appends its name before and after the inner call.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Decorator for Trace {
        fn name(&self) -> &'static str {
            self.name
        }

        fn wrap(&self, next: Dispatch) -> Dispatch {
            let name = self.name;
            let log = Arc::clone(&self.log);
            Arc::new(move |request, arguments| {
                let next = Arc::clone(&next);
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.lock().unwrap().push(format!("{name}-before"));
                    let reply = next(request, arguments).await;
                    log.lock().unwrap().push(format!("{name}-after"));
                    reply
                })
            })
        }
    }

    fn request(method: Method) -> Request {
        http::Request::builder()
            .method(method)
            .uri("/aws/billrepository")
            .body(bytes::Bytes::new())
            .expect("valid request")
    }

    fn ok_route() -> Route {
        route(|_request, _arguments| async { (StatusCode::OK, Payload::Data(json!("ok"))) })
    }

    #[tokio::test]
    async fn present_method_dispatches_its_chain() {
        let (endpoint, _docs) = MethodMuxer::new()
            .get(ok_route())
            .build("/aws/billrepository")
            .expect("builds");

        let reply = endpoint.dispatch(request(Method::GET), Arguments::new()).await;
        assert_eq!(reply.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn absent_method_is_405_and_no_decorator_runs() {
        let uniform_runs = Arc::new(AtomicUsize::new(0));
        let method_runs = Arc::new(AtomicUsize::new(0));

        let (endpoint, _docs) = MethodMuxer::new()
            .get(ok_route().with(Counting {
                runs: Arc::clone(&method_runs),
            }))
            .with(Counting {
                runs: Arc::clone(&uniform_runs),
            })
            .build("/aws/billrepository")
            .expect("builds");

        let reply = endpoint
            .dispatch(request(Method::DELETE), Arguments::new())
            .await;

        assert_eq!(reply.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            reply.payload(),
            &Payload::Error("method not allowed".to_string())
        );
        assert_eq!(uniform_runs.load(Ordering::SeqCst), 0);
        assert_eq!(method_runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_method_lists_the_allowed_ones() {
        let (endpoint, _docs) = MethodMuxer::new()
            .get(ok_route())
            .post(ok_route())
            .build("/aws/billrepository")
            .expect("builds");

        let reply = endpoint
            .dispatch(request(Method::PATCH), Arguments::new())
            .await;
        assert_eq!(
            reply.headers().get(http::header::ALLOW).expect("allow header"),
            "GET, POST"
        );
    }

    #[tokio::test]
    async fn uniform_decorators_fold_outside_per_method_ones() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);

        let (endpoint, _docs) = MethodMuxer::new()
            .get(
                route(move |_request, _arguments| {
                    let log = Arc::clone(&handler_log);
                    async move {
                        log.lock().unwrap().push("handler".to_string());
                        (StatusCode::OK, Payload::Empty)
                    }
                })
                .with(Trace {
                    name: "method",
                    log: Arc::clone(&log),
                }),
            )
            .with(Trace {
                name: "uniform",
                log: Arc::clone(&log),
            })
            .build("/costs")
            .expect("builds");

        endpoint.dispatch(request(Method::GET), Arguments::new()).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "uniform-before",
                "method-before",
                "handler",
                "method-after",
                "uniform-after"
            ]
        );
    }

    #[test]
    fn duplicate_method_is_an_error() {
        let result = MethodMuxer::new()
            .get(ok_route())
            .get(ok_route())
            .build("/costs");
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateMethod { method, .. }) if method == Method::GET
        ));
    }

    #[test]
    fn empty_muxer_is_an_error() {
        let result = MethodMuxer::new().build("/costs");
        assert!(matches!(result, Err(RegistryError::EmptyRegistration(_))));
    }

    #[test]
    fn per_method_documentation_overrides_the_uniform_entry() {
        let (_endpoint, docs) = MethodMuxer::new()
            .get(ok_route())
            .post(ok_route().with(crate::Documentation {
                summary: "add a new bill repository to an aws account",
                description: "",
            }))
            .with(crate::Documentation {
                summary: "interact with aws account's bill repositories",
                description: "A bill repository is an S3 location (bucket+prefix).",
            })
            .build("/aws/billrepository")
            .expect("builds");

        let get_doc = docs
            .iter()
            .find(|(method, _)| *method == Method::GET)
            .map(|(_, doc)| doc)
            .expect("GET documented");
        assert_eq!(get_doc.summary, "interact with aws account's bill repositories");

        let post_doc = docs
            .iter()
            .find(|(method, _)| *method == Method::POST)
            .map(|(_, doc)| doc)
            .expect("POST documented");
        assert_eq!(post_doc.summary, "add a new bill repository to an aws account");
        assert_eq!(
            post_doc.description,
            "A bill repository is an S3 location (bucket+prefix)."
        );
    }
}
