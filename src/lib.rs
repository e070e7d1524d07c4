//! Minimal HTTP request dispatch.
//!
//! Handlers are registered against an exact (path, method) pair and receive
//! a [`RequestContext`] to read from and a [`ResponseWriter`] to answer
//! with. hyper owns the wire protocol; this crate owns routing, the
//! request/response helpers and the boundary that turns failures into 500s.

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use app::App;
pub use config::ServerConfig;
pub use error::{BoxError, ServeError};
pub use http::{BodyError, Reply, RequestContext, ResponseError, ResponseWriter, Server};
pub use lifecycle::Shutdown;
pub use routing::{Handler, HandlerFuture, HandlerResult, Router};
