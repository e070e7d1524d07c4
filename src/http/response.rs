//! Response construction.
//!
//! # Responsibilities
//! - Collect status and headers for one outbound response
//! - Send raw bytes, JSON or plain text exactly once
//! - Map status codes to their fixed reason phrases
//!
//! # Design Decisions
//! - Send operations consume the writer, so a response cannot be sent twice
//! - Unknown status codes fail fast (no generic reason phrase)
//! - Header names/values are validated at send time, not when set

use bytes::Bytes;
use http_body_util::Full;
use hyper::ext::ReasonPhrase;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// Content type set by [`ResponseWriter::json`].
pub const APPLICATION_JSON: &str = "application/json";

/// Content type set by [`ResponseWriter::text`].
pub const TEXT_PLAIN: &str = "text/plain";

/// Errors raised while sending a response.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Status code has no entry in the reason-phrase table.
    #[error("unknown status code: {0}")]
    UnknownStatus(u16),

    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),

    /// JSON payload could not be serialized.
    #[error("failed to serialize JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reason phrase for the status codes this crate knows how to send.
pub fn reason_phrase(status: u16) -> Option<&'static str> {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => return None,
    };
    Some(reason)
}

/// Builder for a single response.
///
/// Status defaults to 200 with no headers. One of [`raw`](Self::raw),
/// [`json`](Self::json) or [`text`](Self::text) finishes the response and
/// yields the [`Reply`] a handler returns.
#[derive(Debug, Clone)]
#[must_use = "a ResponseWriter does nothing until raw, json or text is called"]
pub struct ResponseWriter {
    status: u16,
    headers: Vec<(String, String)>,
}

impl ResponseWriter {
    /// Writer with status 200 and no headers.
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
        }
    }

    /// Set the status code.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Append a header. Sent in insertion order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append several headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Send `data` as the body with the current status and headers.
    pub fn raw(self, data: impl Into<Bytes>) -> Result<Reply, ResponseError> {
        let reason =
            reason_phrase(self.status).ok_or(ResponseError::UnknownStatus(self.status))?;
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| ResponseError::UnknownStatus(self.status))?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ResponseError::InvalidHeaderName(name.clone()))?;
            let header_value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|_| ResponseError::InvalidHeaderValue(name))?;
            headers.append(header_name, header_value);
        }

        Ok(Reply {
            status,
            reason,
            headers,
            body: data.into(),
        })
    }

    /// Serialize `data` as JSON and send it as `application/json`.
    pub fn json<T: Serialize + ?Sized>(self, data: &T) -> Result<Reply, ResponseError> {
        let body = serde_json::to_vec(data)?;
        self.with_content_type(APPLICATION_JSON).raw(body)
    }

    /// Send `data` as a UTF-8 `text/plain` body.
    pub fn text(self, data: impl Into<String>) -> Result<Reply, ResponseError> {
        self.with_content_type(TEXT_PLAIN).raw(data.into())
    }

    fn with_content_type(mut self, content_type: &str) -> Self {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        self.header(CONTENT_TYPE.as_str(), content_type)
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished response, ready to be written to the connection.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    reason: &'static str,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase written on the status line.
    pub fn reason(&self) -> &'static str {
        self.reason
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Convert into a hyper response carrying the fixed reason phrase.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .extensions_mut()
            .insert(ReasonPhrase::from_static(self.reason.as_bytes()));
        response
    }

    /// Plain-text 500 that does not go through header validation.
    pub(crate) fn internal_error(message: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            reason: "Internal Server Error",
            headers,
            body: Bytes::from(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_table() {
        assert_eq!(reason_phrase(200), Some("OK"));
        assert_eq!(reason_phrase(201), Some("Created"));
        assert_eq!(reason_phrase(204), Some("No Content"));
        assert_eq!(reason_phrase(405), Some("Method Not Allowed"));
        assert_eq!(reason_phrase(500), Some("Internal Server Error"));
        assert_eq!(reason_phrase(418), None);
        assert_eq!(reason_phrase(302), None);
    }

    #[test]
    fn text_defaults_to_ok() {
        let reply = ResponseWriter::new().text("world").unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(reply.reason(), "OK");
        assert_eq!(reply.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(reply.body().as_ref(), b"world");
    }

    #[test]
    fn json_sets_content_type_and_round_trips() {
        let reply = ResponseWriter::new()
            .json(&serde_json::json!({ "a": 1 }))
            .unwrap();
        assert_eq!(reply.headers()[CONTENT_TYPE], "application/json");

        let parsed: serde_json::Value = serde_json::from_slice(reply.body()).unwrap();
        assert_eq!(parsed, serde_json::json!({ "a": 1 }));
    }

    #[test]
    fn unknown_status_fails_fast() {
        let err = ResponseWriter::new().status(418).text("teapot").unwrap_err();
        assert!(matches!(err, ResponseError::UnknownStatus(418)));

        let err = ResponseWriter::new().status(302).raw("").unwrap_err();
        assert!(matches!(err, ResponseError::UnknownStatus(302)));
    }

    #[test]
    fn raw_keeps_caller_headers() {
        let reply = ResponseWriter::new()
            .status(201)
            .header("X-Trace", "abc")
            .headers([("Cache-Control", "no-store")])
            .raw(vec![0u8, 1, 2])
            .unwrap();

        assert_eq!(reply.status(), StatusCode::CREATED);
        assert_eq!(reply.reason(), "Created");
        assert_eq!(reply.headers()["x-trace"], "abc");
        assert_eq!(reply.headers()["cache-control"], "no-store");
        assert!(reply.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(reply.body().as_ref(), &[0u8, 1, 2]);
    }

    #[test]
    fn helper_content_type_overrides_caller_value() {
        let reply = ResponseWriter::new()
            .header("content-TYPE", "text/html")
            .json(&[1, 2, 3])
            .unwrap();

        let values: Vec<_> = reply.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(values, vec!["application/json"]);
    }

    #[test]
    fn invalid_headers_are_rejected() {
        let err = ResponseWriter::new()
            .header("bad header", "x")
            .text("")
            .unwrap_err();
        assert!(matches!(err, ResponseError::InvalidHeaderName(_)));

        let err = ResponseWriter::new()
            .header("x-ok", "line\nbreak")
            .text("")
            .unwrap_err();
        assert!(matches!(err, ResponseError::InvalidHeaderValue(name) if name == "x-ok"));
    }

    #[test]
    fn non_ascii_header_values_are_accepted() {
        let reply = ResponseWriter::new()
            .header("X-Name", "Jos\u{e9}")
            .text("")
            .unwrap();
        assert_eq!(reply.headers()["x-name"].as_bytes(), "Jos\u{e9}".as_bytes());
    }

    #[test]
    fn into_response_carries_reason_phrase() {
        let response = ResponseWriter::new()
            .status(404)
            .text("Not Found")
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let reason = response.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"Not Found");
    }
}
