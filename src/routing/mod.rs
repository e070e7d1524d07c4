//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     App::get/post/register
//!     → router.rs (append Route in order)
//!
//! Per request:
//!     (path, method)
//!     → router.rs (first exact match)
//!     → handler.rs (invoke handler) or 404 Not Found
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - No patterns, parameters or prefixes: exact match only
//! - First match wins (ordered by registration)

pub mod handler;
pub mod router;

pub use handler::{FnHandler, Handler, HandlerFuture, HandlerResult};
pub use router::{Route, Router, NOT_FOUND_BODY};
