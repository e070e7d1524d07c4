//! Request access for handlers.
//!
//! # Responsibilities
//! - Expose method, path (as received, query included) and headers
//! - Parse `Content-Length` leniently
//! - Read exactly the declared number of body bytes
//! - Decode the body as JSON or UTF-8 text
//!
//! # Design Decisions
//! - Body is read lazily on first access, then cached
//! - A short body is an error, never a silent truncation
//! - Body size and read time are bounded by [`BodyLimits`]

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::{Method, Request};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::error::BoxError;

/// Errors raised while reading or decoding a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// Stream ended before `Content-Length` bytes arrived.
    #[error("request body ended after {received} of {expected} bytes")]
    Incomplete { expected: usize, received: usize },

    #[error("request body of {length} bytes exceeds the {limit} byte limit")]
    TooLarge { length: usize, limit: usize },

    #[error("timed out reading request body")]
    Timeout,

    #[error("failed to read request body: {0}")]
    Read(#[source] BoxError),

    /// An earlier read failed and took the body stream with it.
    #[error("request body has already been consumed")]
    Consumed,

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Unique identifier for a request, carried in its log span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Peer address of the connection a request arrived on.
///
/// Inserted into request extensions by the server before dispatch.
#[derive(Debug, Clone, Copy)]
pub struct RemoteAddr(pub SocketAddr);

/// Bounds applied when reading a request body.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub max_size: usize,
    pub read_timeout: Duration,
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self {
            max_size: 2 * 1024 * 1024,
            read_timeout: Duration::from_secs(30),
        }
    }
}

type BodySource = UnsyncBoxBody<Bytes, BoxError>;

/// One inbound request as seen by a handler.
pub struct RequestContext {
    id: RequestId,
    method: Method,
    path: String,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    body: Option<BodySource>,
    cached: Option<Bytes>,
    limits: BodyLimits,
}

impl RequestContext {
    /// Wrap a decoded request with default body limits.
    pub fn from_request<B>(request: Request<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self::new(request, BodyLimits::default())
    }

    /// Wrap a decoded request with explicit body limits.
    pub fn new<B>(request: Request<B>, limits: BodyLimits) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let remote_addr = parts.extensions.get::<RemoteAddr>().map(|addr| addr.0);

        Self {
            id: RequestId::new(),
            method: parts.method,
            path: parts.uri.to_string(),
            headers: parts.headers,
            remote_addr,
            body: Some(body.map_err(Into::into).boxed_unsync()),
            cached: None,
            limits,
        }
    }

    pub(crate) fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    /// Id carried in this request's log span.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Method exactly as received.
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Request target exactly as received, including any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Peer address, when served over a socket.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Declared body length. Absent or malformed headers count as 0.
    pub fn content_length(&self) -> usize {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Read exactly `content_length()` bytes of body.
    ///
    /// The bytes are cached, so later calls (and `json`/`text`) are free.
    pub async fn raw(&mut self) -> Result<Bytes, BodyError> {
        if let Some(bytes) = &self.cached {
            return Ok(bytes.clone());
        }

        let expected = self.content_length();
        if expected > self.limits.max_size {
            return Err(BodyError::TooLarge {
                length: expected,
                limit: self.limits.max_size,
            });
        }

        let body = self.body.take().ok_or(BodyError::Consumed)?;
        let bytes = tokio::time::timeout(self.limits.read_timeout, read_exact(body, expected))
            .await
            .map_err(|_| BodyError::Timeout)??;

        self.cached = Some(bytes.clone());
        Ok(bytes)
    }

    /// Body parsed as JSON.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let bytes = self.raw().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Body decoded as UTF-8.
    pub async fn text(&mut self) -> Result<String, BodyError> {
        let bytes = self.raw().await?;
        Ok(std::str::from_utf8(&bytes)?.to_owned())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("remote_addr", &self.remote_addr)
            .field("cached", &self.cached.as_ref().map(Bytes::len))
            .finish_non_exhaustive()
    }
}

async fn read_exact(mut body: BodySource, expected: usize) -> Result<Bytes, BodyError> {
    if expected == 0 {
        return Ok(Bytes::new());
    }

    let mut buf = BytesMut::with_capacity(expected);
    while buf.len() < expected {
        let Some(frame) = body.frame().await else {
            return Err(BodyError::Incomplete {
                expected,
                received: buf.len(),
            });
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) if is_truncated_body(&*e) => {
                return Err(BodyError::Incomplete {
                    expected,
                    received: buf.len(),
                });
            }
            Err(e) => return Err(BodyError::Read(e)),
        };
        // Trailers carry no body bytes.
        if let Ok(data) = frame.into_data() {
            buf.extend_from_slice(&data);
        }
    }

    buf.truncate(expected);
    Ok(buf.freeze())
}

/// hyper reports a peer that closed mid-body as a body error caused by
/// an `UnexpectedEof` I/O error.
fn is_truncated_body(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut cause = Some(err);
    while let Some(e) = cause {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::UnexpectedEof {
                return true;
            }
        }
        if e.downcast_ref::<hyper::Error>()
            .is_some_and(hyper::Error::is_incomplete_message)
        {
            return true;
        }
        cause = e.source();
    }
    false
}
