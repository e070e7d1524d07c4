//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server and router produce:
//!     → logging.rs (structured log events)
//!     → per-request span: request{id, method, path}
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Request ID flows through every event of a request

pub mod logging;

pub use logging::init_logging;
