//! Request and response values exchanged with a [`Transport`](crate::Transport).

use std::fmt;
use std::time::Duration;

use courier_core::{ErrorKind, MessagingError};
use serde_json::Value;
use thiserror::Error;

/// HTTP method used by the client. The backend only accepts these two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// One outbound HTTP request with a JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Extra headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Deadline for this request alone.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// `POST` with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
            timeout: None,
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the per-request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received, whatever its status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header value.
    pub content_type: Option<String>,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json; charset=UTF-8".into()),
            body: body.to_string(),
        }
    }

    /// Response with a plain text body.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/plain".into()),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parsed JSON body, `None` when the body is not JSON.
    pub fn data(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Whether the body parses as JSON.
    pub fn is_json(&self) -> bool {
        self.data().is_some()
    }
}

/// Failure to obtain any response at all.
#[derive(Clone, Debug, Error)]
pub enum TransportError {
    /// The request deadline elapsed.
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout {
        /// Request URL.
        url: String,
        /// Deadline that elapsed.
        timeout_ms: u128,
    },

    /// Connection or I/O failure.
    #[error("request to {url} failed: {reason}")]
    Connection {
        /// Request URL.
        url: String,
        /// Error description.
        reason: String,
    },

    /// The access token could not be obtained.
    #[error("failed to obtain access token: {0}")]
    Credential(String),

    /// The batch endpoint replied with something other than a multipart body.
    #[error("batch request failed with status {}", .0.status)]
    BatchRejected(HttpResponse),

    /// A multipart reply could not be parsed.
    #[error("malformed batch response: {0}")]
    Malformed(String),

    /// The session was used after it was closed.
    #[error("session is closed")]
    SessionClosed,
}

impl From<TransportError> for MessagingError {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Timeout { .. } => ErrorKind::NetworkTimeout,
            TransportError::Connection { .. } | TransportError::SessionClosed => {
                ErrorKind::NetworkError
            }
            TransportError::Credential(_) => ErrorKind::AuthenticationError,
            TransportError::BatchRejected(_) | TransportError::Malformed(_) => ErrorKind::Internal,
        };
        MessagingError::new(kind, err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
