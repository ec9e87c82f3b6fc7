//! Transport calls and their translation into send outcomes.

use std::sync::Arc;
use std::time::Duration;

use courier_core::constants::client_header;
use courier_core::{BatchResponse, MessagingError, Result, SendResponse};
use courier_transport::{HttpRequest, HttpResponse, Session, Transport, TransportError};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error_mapping::{error_code, error_from_response};

/// Client identification header sent with every request.
pub const CLIENT_HEADER: &str = "X-Firebase-Client";

/// Issues requests on a [`Transport`] and maps the replies.
pub struct RequestHandler {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl RequestHandler {
    /// Wrap `transport`; `timeout` bounds every single request.
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// The wrapped transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn request(&self, url: &str, body: Value) -> HttpRequest {
        HttpRequest::post(url, body)
            .with_header(CLIENT_HEADER, client_header())
            .with_header("access_token_auth", "true")
            .with_timeout(self.timeout)
    }

    /// One request; any failure is returned as an error.
    ///
    /// A reply is a failure when it is not JSON, not 2xx, or carries a
    /// backend error code.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn invoke(&self, url: &str, body: Value) -> Result<Value> {
        debug!("invoking request handler");
        let response = self.transport.send(self.request(url, body)).await?;
        let Some(data) = response.data() else {
            return Err(error_from_response(&response));
        };
        if !response.is_success() || error_code(&data).is_some() {
            let err = error_from_response(&response);
            warn!(status = response.status, code = err.code(), "backend rejected request");
            return Err(err);
        }
        Ok(data)
    }

    /// One request whose outcome is captured, never returned as an error.
    ///
    /// Goes through `session` when one is given.
    pub async fn invoke_for_send_response(
        &self,
        url: &str,
        body: Value,
        session: Option<&dyn Session>,
    ) -> SendResponse {
        let request = self.request(url, body);
        let result = match session {
            Some(session) => session.send(request).await,
            None => self.transport.send(request).await,
        };
        match result {
            Ok(response) => build_send_response(&response),
            Err(err) => {
                warn!(error = %err, "request failed without a response");
                SendResponse::failure(err.into())
            }
        }
    }

    /// All requests in one batch call, mapped part by part.
    ///
    /// A failure of the batch call itself is returned as an error.
    #[instrument(skip_all, fields(batch_url = %batch_url, parts = requests.len()))]
    pub async fn invoke_batch(
        &self,
        batch_url: &str,
        requests: Vec<(String, Value)>,
    ) -> Result<BatchResponse> {
        let requests = requests
            .into_iter()
            .map(|(url, body)| {
                HttpRequest::post(url, body).with_header(CLIENT_HEADER, client_header())
            })
            .collect();
        match self.transport.send_batch(batch_url, requests).await {
            Ok(parts) => Ok(BatchResponse::from_responses(
                parts.iter().map(build_send_response).collect(),
            )),
            Err(TransportError::BatchRejected(response)) => Err(error_from_response(&response)),
            Err(err) => Err(MessagingError::from(err)),
        }
    }
}

/// Outcome of one send: `200` with the backend id, anything else a failure.
pub fn build_send_response(response: &HttpResponse) -> SendResponse {
    if response.status != 200 {
        return SendResponse::failure(error_from_response(response));
    }
    let name = response
        .data()
        .and_then(|data| data.get("name").and_then(Value::as_str).map(String::from));
    match name {
        Some(name) => SendResponse::success(name),
        None => SendResponse::failure(MessagingError::internal(format!(
            "send succeeded without a message name: {}",
            response.body
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
