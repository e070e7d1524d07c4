//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files and
//! fall back to defaults for any missing field.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::BodyLimits;

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when none is given.
pub const DEFAULT_PORT: u16 = 8000;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Connection and response behaviour.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Limits handed to every `RequestContext`.
    pub fn body_limits(&self) -> BodyLimits {
        BodyLimits {
            max_size: self.limits.max_body_size,
            read_timeout: Duration::from_secs(self.timeouts.body_read_secs),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host name or IP to bind.
    pub host: String,

    /// Port to bind (0 picks an ephemeral port).
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// `host:port` as a bind string.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_connections: 1024,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest `Content-Length` a handler may read, in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to receive request headers.
    pub header_read_secs: u64,

    /// Time allowed to receive the request body.
    pub body_read_secs: u64,

    /// Time in-flight connections get to finish after shutdown starts.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            header_read_secs: 30,
            body_read_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// HTTP behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Keep connections open between requests.
    pub keep_alive: bool,

    /// Value of the `Server` response header; `None` omits it.
    pub server_header: Option<String>,

    /// Send handler error messages as the 500 body.
    /// When false the body is the bare reason phrase.
    pub expose_error_details: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            server_header: Some(concat!("erica/", env!("CARGO_PKG_VERSION")).to_string()),
            expose_error_details: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
