//! Crate-level error types.

use thiserror::Error;

use crate::net::listener::ListenerError;

/// Error type handlers may return; its `Display` text becomes a 500 body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the server from serving.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
