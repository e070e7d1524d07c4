//! HTTP server and dispatch boundary.
//!
//! # Responsibilities
//! - Accept connections and serve each on its own task via hyper http1
//! - Build a RequestContext/ResponseWriter pair per request
//! - Convert handler errors and panics into 500 responses
//! - Drain in-flight connections on shutdown

use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::FutureExt;
use http_body_util::Full;
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, SERVER};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::error::{BoxError, ServeError};
use crate::http::request::{RemoteAddr, RequestContext, RequestId};
use crate::http::response::{Reply, ResponseWriter};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener};
use crate::routing::Router;

/// Body used for 500s when error details are hidden.
const GENERIC_ERROR_BODY: &str = "Internal Server Error";

/// Pause after an accept error that is not tied to a single peer.
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Serves a frozen [`Router`].
///
/// Cheap to clone; every connection task holds one.
#[derive(Debug, Clone)]
pub struct Server {
    router: Arc<Router>,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Freeze `router` and `config` for serving.
    pub fn new(router: Router, config: ServerConfig) -> Self {
        Self {
            router: Arc::new(router),
            config: Arc::new(config),
        }
    }

    /// The frozen route table.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Dispatch boundary: answer one request, whatever the handler does.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let id = RequestId::new();
        let method = request.method().as_str().to_owned();
        let span = tracing::info_span!(
            "request",
            id = %id,
            method = %method,
            path = %request.uri(),
        );

        async move {
            let started = Instant::now();
            let context = RequestContext::new(request, self.config.body_limits()).with_id(id);

            let outcome = AssertUnwindSafe(self.router.dispatch(context, ResponseWriter::new(), &method))
                .catch_unwind()
                .await;

            let reply = match outcome {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "Handler failed");
                    self.failure(err.to_string())
                }
                Err(panic) => {
                    let message = panic_message(&*panic);
                    tracing::error!(panic = %message, "Handler panicked");
                    self.failure(message)
                }
            };

            tracing::info!(
                status = reply.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            );
            self.finish(reply)
        }
        .instrument(span)
        .await
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: Listener, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr()?;
        tracing::debug!(address = %addr, "Accept loop starting");

        let tracker = ConnectionTracker::new();
        let drain = Shutdown::new();
        let builder = self.connection_builder();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.spawn_connection(stream, peer, permit, &builder, &tracker, &drain);
                    }
                    Err(e) if e.is_connection_error() => {
                        tracing::debug!(error = %e, "Accept failed");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed, backing off");
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                        }
                    }
                },
            }
        }

        // Stop accepting before draining.
        drop(listener);
        drain.trigger();

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        if !tracker.wait_for_idle(grace).await {
            tracing::warn!(
                active_connections = tracker.active_count(),
                grace_secs = grace.as_secs(),
                "Grace period elapsed with connections still open"
            );
        }
        Ok(())
    }

    fn connection_builder(&self) -> http1::Builder {
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(self.config.http.keep_alive)
            .header_read_timeout(Duration::from_secs(self.config.timeouts.header_read_secs));
        builder
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        builder: &http1::Builder,
        tracker: &ConnectionTracker,
        drain: &Shutdown,
    ) {
        let guard = tracker.track();
        let mut drain_rx = drain.subscribe();
        let builder = builder.clone();
        let server = self.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let connection_id = guard.id();

            let service = service_fn(move |mut request: Request<Incoming>| {
                let server = server.clone();
                request.extensions_mut().insert(RemoteAddr(peer));
                async move { Ok::<_, Infallible>(server.handle(request).await) }
            });

            let conn = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = drain_rx.recv() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };

            if let Err(e) = result {
                tracing::debug!(connection_id = %connection_id, peer_addr = %peer, error = %e, "Connection error");
            }
            drop(guard);
        });
    }

    fn failure(&self, message: String) -> Reply {
        let body = if self.config.http.expose_error_details {
            message
        } else {
            GENERIC_ERROR_BODY.to_string()
        };

        ResponseWriter::new()
            .status(500)
            .text(body.clone())
            .unwrap_or_else(|_| Reply::internal_error(body))
    }

    fn finish(&self, mut reply: Reply) -> Response<Full<Bytes>> {
        if let Some(name) = &self.config.http.server_header {
            if let Ok(value) = HeaderValue::from_str(name) {
                reply.headers_mut().entry(SERVER).or_insert(value);
            }
        }
        reply.into_response()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
