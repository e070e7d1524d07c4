//! Route registry and dispatch.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Find the first route whose path and method match exactly
//! - Invoke its handler, or answer 404 when nothing matches
//!
//! # Design Decisions
//! - Exact string comparison on path (query included) and method
//! - Duplicates allowed; first registered wins
//! - Immutable once serving starts (shared via `Arc`, no locks)
//! - O(n) scan (acceptable for typical route counts)

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::BoxError;
use crate::http::{Reply, RequestContext, ResponseWriter};
use crate::routing::handler::{FnHandler, Handler, HandlerResult};

/// Body sent when no route matches.
pub const NOT_FOUND_BODY: &str = "Not Found";

/// A registered (path, method, handler) entry.
pub struct Route {
    path: String,
    method: String,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// Path the route matches, compared verbatim.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Method the route matches, case-sensitive.
    pub fn method(&self) -> &str {
        &self.method
    }

    fn matches(&self, path: &str, method: &str) -> bool {
        self.path == path && self.method == method
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closure handler for `path` and `method`.
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
        self.register_handler(path, method, FnHandler::new(handler))
    }

    /// Append a [`Handler`] implementation for `path` and `method`.
    pub fn register_handler(
        &mut self,
        path: impl Into<String>,
        method: impl Into<String>,
        handler: impl Handler,
    ) -> &mut Self {
        let route = Route {
            path: path.into(),
            method: method.into(),
            handler: Arc::new(handler),
        };
        tracing::debug!(path = %route.path, method = %route.method, "Route registered");
        self.routes.push(route);
        self
    }

    /// Register a `GET` handler.
    pub fn get<F, Fut, E>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.register(path, "GET", handler)
    }

    /// Register a `POST` handler.
    pub fn post<F, Fut, E>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.register(path, "POST", handler)
    }

    /// First route matching `path` and `method`, if any.
    pub fn find(&self, path: &str, method: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path, method))
    }

    /// Routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Invoke the first matching handler, or send 404 `Not Found`.
    ///
    /// Handler errors are returned as-is; turning them into a 500 is the
    /// caller's job.
    pub async fn dispatch(
        &self,
        request: RequestContext,
        response: ResponseWriter,
        method: &str,
    ) -> HandlerResult {
        match self.find(request.path(), method) {
            Some(route) => {
                tracing::debug!(path = %route.path, method = %route.method, "Dispatching request");
                route.handler.call(request, response).await
            }
            None => {
                tracing::debug!(path = %request.path(), method, "No route matched");
                Ok(response.status(404).text(NOT_FOUND_BODY)?)
            }
        }
    }
}
