//! The Hyper transport adapter.
//!
//! Owns the accept loop and the boundary between HTTP and the pipeline:
//! collect the body, build the pipeline [`Request`], run the composed
//! dispatch under the request timeout, serialize the [`Reply`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use tally_core::{Arguments, Reply, Request};
use tally_pipeline::{compose, Decorator, Dispatch};
use tally_routes::Registry;

use crate::config::ServerConfig;
use crate::shutdown::ShutdownSignal;

/// The HTTP response type written on the wire.
pub type HttpResponse = http::Response<Full<Bytes>>;

/// Transport-layer failures. All of these are boot fatal.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured address could not be parsed or bound.
    #[error("failed to bind: {0}")]
    Bind(String),
}

/// The Tally HTTP server.
///
/// Construction composes the process-global decorator list around the
/// frozen registry exactly once; per request, the transport only collects
/// the body and invokes the resulting dispatch.
pub struct Server {
    config: ServerConfig,
    dispatch: Dispatch,
}

impl Server {
    /// Creates a server over a frozen registry.
    ///
    /// `globals` is the process-global decorator list, outermost first; it
    /// wraps every pattern, including the 404 and 405 outcomes, which is
    /// what puts `X-Request-ID` and CORS headers on error responses.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        registry: Arc<Registry>,
        globals: &[Arc<dyn Decorator>],
    ) -> Self {
        let dispatch = compose(globals, registry.into_dispatch());
        Self { config, dispatch }
    }

    /// Binds the configured address.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let addr = self.config.socket_addr().map_err(|err| {
            ServerError::Bind(format!(
                "invalid address '{}': {err}",
                self.config.http_addr()
            ))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Bind(format!("failed to bind {addr}: {err}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| ServerError::Bind(err.to_string()))?;

        Ok(BoundServer {
            config: self.config,
            dispatch: self.dispatch,
            listener,
            local_addr,
        })
    }

    /// Binds and serves until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.bind()
            .await?
            .serve(ShutdownSignal::with_os_signals())
            .await
    }
}

/// A server bound to its listening socket.
pub struct BoundServer {
    config: ServerConfig,
    dispatch: Dispatch,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundServer {
    /// The actual bound address (useful when binding port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until `shutdown` triggers.
    pub async fn serve(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        tracing::info!(addr = %self.local_addr, "listening");
        let request_timeout = self.config.request_timeout();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let dispatch = Arc::clone(&self.dispatch);
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, dispatch, request_timeout, shutdown, remote_addr)
                                    .await;
                            });
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to accept connection");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    dispatch: Dispatch,
    request_timeout: Duration,
    shutdown: ShutdownSignal,
    remote_addr: SocketAddr,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: http::Request<Incoming>| {
        let dispatch = Arc::clone(&dispatch);
        async move { handle_request(dispatch, request_timeout, req).await }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::select! {
        result = conn => {
            if let Err(err) = result {
                tracing::debug!(remote = %remote_addr, error = %err, "connection error");
            }
        }
        _ = shutdown.recv() => {
            tracing::debug!(remote = %remote_addr, "connection closed by shutdown");
        }
    }
}

async fn handle_request(
    dispatch: Dispatch,
    request_timeout: Duration,
    req: http::Request<Incoming>,
) -> Result<HttpResponse, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match tokio::time::timeout(request_timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "failed to read request body");
            return Ok(write_reply(Reply::error(
                StatusCode::BAD_REQUEST,
                "failed to read request body",
            )));
        }
        Err(_) => {
            return Ok(write_reply(Reply::error(
                StatusCode::REQUEST_TIMEOUT,
                "request body collection timed out",
            )));
        }
    };

    let request = http::Request::from_parts(parts, body);
    let reply = dispatch_with_timeout(&dispatch, request_timeout, request).await;
    Ok(write_reply(reply))
}

/// Runs the dispatch under the request timeout. On expiry the request
/// future is dropped (that drop is the request-scoped cancellation) and
/// the client gets a timeout reply.
async fn dispatch_with_timeout(
    dispatch: &Dispatch,
    request_timeout: Duration,
    request: Request,
) -> Reply {
    match tokio::time::timeout(request_timeout, dispatch(request, Arguments::new())).await {
        Ok(reply) => reply,
        Err(_) => {
            tracing::warn!("request timed out");
            Reply::error(StatusCode::GATEWAY_TIMEOUT, "request timed out")
        }
    }
}

/// Serializes a [`Reply`] to the wire response.
///
/// Writes the status, merges the reply's headers, and encodes the payload
/// as JSON with a trailing newline; error payloads come out as the
/// `{"error": "<message>"}` envelope.
#[must_use]
pub fn write_reply(reply: Reply) -> HttpResponse {
    let (status, headers, payload) = reply.into_parts();

    let mut builder = http::Response::builder().status(status);
    let body = match payload.to_json() {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            let mut encoded = serde_json::to_vec(&value).expect("serialize reply payload");
            encoded.push(b'\n');
            Bytes::from(encoded)
        }
        None => Bytes::new(),
    };

    let mut response = builder
        .body(Full::new(body))
        .expect("build wire response");
    response.headers_mut().extend(headers);
    response
}
