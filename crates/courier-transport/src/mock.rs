//! Programmable in-memory transport for deterministic dispatcher tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::traits::{Session, Transport};
use crate::types::{HttpRequest, HttpResponse, TransportError};

/// What the mock answers for one request.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Reply with this response.
    Reply(HttpResponse),
    /// Fail without a response.
    Fail(TransportError),
    /// Wait, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    /// `200` with `{"name": <message_id>}`.
    pub fn message_id(message_id: &str) -> Self {
        Self::Reply(HttpResponse::json(200, &json!({ "name": message_id })))
    }

    /// Reply with a JSON body.
    pub fn json(status: u16, body: Value) -> Self {
        Self::Reply(HttpResponse::json(status, &body))
    }

    /// Backend error in the v1 `{"error": {"status", "message"}}` shape.
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::json(
            status,
            json!({ "error": { "code": status, "status": code, "message": message } }),
        )
    }

    /// Wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

type Responder = Box<dyn Fn(&HttpRequest) -> MockResponse + Send + Sync>;
type BatchResponder = Box<dyn Fn(&[HttpRequest]) -> MockResponse + Send + Sync>;

struct Inner {
    responder: Responder,
    batch_responder: Option<BatchResponder>,
    requests: Mutex<Vec<HttpRequest>>,
    batches: Mutex<Vec<(String, Vec<HttpRequest>)>>,
    session_requests: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
}

impl Inner {
    async fn respond(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = (self.responder)(&request);
        self.requests.lock().push(request);
        resolve(response).await
    }
}

/// Resolve a [`MockResponse`], unrolling nested delays.
async fn resolve(response: MockResponse) -> Result<HttpResponse, TransportError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Reply(res) => return Ok(res),
            MockResponse::Fail(err) => return Err(err),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}

/// Transport that answers from a closure and records everything it sees.
pub struct MockTransport {
    inner: Arc<Inner>,
    sessions: bool,
}

impl MockTransport {
    /// Answer every request with `responder`.
    pub fn new(responder: impl Fn(&HttpRequest) -> MockResponse + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                responder: Box::new(responder),
                batch_responder: None,
                requests: Mutex::new(Vec::new()),
                batches: Mutex::new(Vec::new()),
                session_requests: AtomicUsize::new(0),
                sessions_opened: AtomicUsize::new(0),
                sessions_closed: AtomicUsize::new(0),
            }),
            sessions: false,
        }
    }

    /// Answer every request with the same response.
    pub fn always(response: MockResponse) -> Self {
        Self::new(move |_| response.clone())
    }

    /// Reject every batch call with the reply `responder` builds.
    ///
    /// Must be called before the transport is shared.
    #[must_use]
    pub fn with_batch_rejection(
        mut self,
        responder: impl Fn(&[HttpRequest]) -> MockResponse + Send + Sync + 'static,
    ) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.batch_responder = Some(Box::new(responder));
        }
        self
    }

    /// Hand out sessions from [`Transport::open_session`].
    #[must_use]
    pub fn with_sessions(mut self) -> Self {
        self.sessions = true;
        self
    }

    /// Every request seen, on the shared client or a session.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.lock().clone()
    }

    /// Number of requests seen.
    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().len()
    }

    /// Number of requests that went through a session.
    pub fn session_request_count(&self) -> usize {
        self.inner.session_requests.load(Ordering::SeqCst)
    }

    /// Batch calls seen, as `(batch_url, requests)`.
    pub fn batches(&self) -> Vec<(String, Vec<HttpRequest>)> {
        self.inner.batches.lock().clone()
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    /// Session close calls so far.
    pub fn sessions_closed(&self) -> usize {
        self.inner.sessions_closed.load(Ordering::SeqCst)
    }
}

/// JSON body of a recorded request, or `Null`.
pub fn body_of(request: &HttpRequest) -> Value {
    request.body.clone().unwrap_or(Value::Null)
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.inner.respond(request).await
    }

    async fn send_batch(
        &self,
        batch_url: &str,
        requests: Vec<HttpRequest>,
    ) -> Result<Vec<HttpResponse>, TransportError> {
        self.inner
            .batches
            .lock()
            .push((batch_url.to_string(), requests.clone()));
        if let Some(batch_responder) = &self.inner.batch_responder {
            let response = resolve(batch_responder(&requests)).await?;
            return Err(TransportError::BatchRejected(response));
        }
        let mut responses = Vec::with_capacity(requests.len());
        for request in &requests {
            responses.push(resolve((self.inner.responder)(request)).await?);
        }
        Ok(responses)
    }

    async fn open_session(&self) -> Result<Option<Arc<dyn Session>>, TransportError> {
        if !self.sessions {
            return Ok(None);
        }
        let _ = self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Arc::new(MockSession {
            inner: Arc::clone(&self.inner),
        })))
    }
}

struct MockSession {
    inner: Arc<Inner>,
}

#[async_trait]
impl Session for MockSession {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let _ = self.inner.session_requests.fetch_add(1, Ordering::SeqCst);
        self.inner.respond(request).await
    }

    fn close(&self) {
        let _ = self.inner.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
