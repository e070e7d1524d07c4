//! Application entry point: route registration plus server start-up.
//!
//! ```no_run
//! use erica::{App, ResponseWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), erica::ServeError> {
//!     let mut app = App::new();
//!     app.get("/hello", |_req, res: ResponseWriter| async move { res.text("world") });
//!     app.run("127.0.0.1", 8000).await
//! }
//! ```

use std::future::Future;

use tokio::net::TcpListener;

use crate::config::{ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{BoxError, ServeError};
use crate::http::{Reply, RequestContext, ResponseWriter, Server};
use crate::lifecycle::shutdown_signal;
use crate::net::Listener;
use crate::routing::{Handler, HandlerResult, Router};

/// Routes plus the configuration needed to serve them.
///
/// Registration borrows the app mutably; serving consumes it, so the route
/// table cannot change once requests are flowing.
#[derive(Debug, Default)]
pub struct App {
    router: Router,
    config: ServerConfig,
}

impl App {
    /// Empty app with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty app with the given configuration.
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            router: Router::new(),
            config,
        }
    }

    /// Register a closure handler for `path` and `method`.
    pub fn register<F, Fut, E>(
        &mut self,
        path: impl Into<String>,
        method: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(RequestContext, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.router.register(path, method, handler);
        self
    }

    /// Register a [`Handler`] implementation for `path` and `method`.
    pub fn register_handler(
        &mut self,
        path: impl Into<String>,
        method: impl Into<String>,
        handler: impl Handler,
    ) -> &mut Self {
        self.router.register_handler(path, method, handler);
        self
    }

    /// Register a `GET` handler.
    pub fn get<F, Fut, E>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.router.get(path, handler);
        self
    }

    /// Register a `POST` handler.
    pub fn post<F, Fut, E>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.router.post(path, handler);
        self
    }

    /// See [`Router::dispatch`].
    pub async fn dispatch(
        &self,
        request: RequestContext,
        response: ResponseWriter,
        method: &str,
    ) -> HandlerResult {
        self.router.dispatch(request, response, method).await
    }

    /// Registered routes.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Configuration used when serving.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Mutable configuration, for adjustments before serving.
    pub fn config_mut(&mut self) -> &mut ServerConfig {
        &mut self.config
    }

    /// Freeze the routes into a [`Server`].
    pub fn into_server(self) -> Server {
        Server::new(self.router, self.config)
    }

    /// Bind `host:port`, serve until SIGINT/SIGTERM, then release the socket.
    pub async fn run(mut self, host: &str, port: u16) -> Result<(), ServeError> {
        self.config.listener.host = host.to_string();
        self.config.listener.port = port;

        let listener = Listener::bind(&self.config.listener).await?;
        let addr = listener.local_addr()?;

        tracing::info!(address = %addr, "Server started at http://{}:{}", host, addr.port());
        let result = self.into_server().serve(listener, shutdown_signal()).await;
        tracing::info!("Server stopped");
        result
    }

    /// [`run`](Self::run) on the configured host and port.
    pub async fn run_configured(self) -> Result<(), ServeError> {
        let host = self.config.listener.host.clone();
        let port = self.config.listener.port;
        self.run(&host, port).await
    }

    /// [`run`](Self::run) on 127.0.0.1:8000.
    pub async fn run_default(self) -> Result<(), ServeError> {
        self.run(DEFAULT_HOST, DEFAULT_PORT).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = Listener::new(listener, self.config.listener.max_connections);
        self.into_server().serve(listener, shutdown).await
    }
}
