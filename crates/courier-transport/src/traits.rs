//! Transport capability consumed by the dispatcher.
//!
//! Implementations perform the HTTP exchange and nothing else: a non-2xx
//! reply is still an `Ok(HttpResponse)`. Only the failure to obtain any reply
//! is a [`TransportError`]. Deadlines are enforced per request.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{HttpRequest, HttpResponse, TransportError};

/// Sends requests to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request on the shared client.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Send all requests as one multipart call to `batch_url`.
    ///
    /// The returned responses are positionally matched to `requests`.
    async fn send_batch(
        &self,
        batch_url: &str,
        requests: Vec<HttpRequest>,
    ) -> Result<Vec<HttpResponse>, TransportError>;

    /// Open a session scoped to one fan-out call.
    ///
    /// Transports without a session concept return `None`, and callers fall
    /// back to [`Transport::send`].
    async fn open_session(&self) -> Result<Option<Arc<dyn Session>>, TransportError> {
        Ok(None)
    }
}

/// A per-call connection, e.g. one multiplexed HTTP/2 connection.
#[async_trait]
pub trait Session: Send + Sync {
    /// Send one request on this session.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Release the session. Requests sent afterwards fail.
    fn close(&self);
}
