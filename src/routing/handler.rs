//! Handler abstraction.
//!
//! A handler receives the request and a fresh response writer, and resolves
//! to the finished [`Reply`]. Closures are adapted through [`FnHandler`];
//! types with their own state implement [`Handler`] directly.

use std::future::Future;
use std::pin::Pin;

use crate::error::BoxError;
use crate::http::{Reply, RequestContext, ResponseWriter};

/// Result of invoking a handler.
pub type HandlerResult = Result<Reply, BoxError>;

/// Boxed future returned by [`Handler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Something that can answer a request.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: RequestContext, response: ResponseWriter) -> HandlerFuture;
}

/// Adapts an async closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut, E> Handler for FnHandler<F>
where
    F: Fn(RequestContext, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn call(&self, request: RequestContext, response: ResponseWriter) -> HandlerFuture {
        let fut = (self.f)(request, response);
        Box::pin(async move { fut.await.map_err(Into::<BoxError>::into) })
    }
}
