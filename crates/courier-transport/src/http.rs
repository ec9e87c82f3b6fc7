//! Real transport backed by `reqwest`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::constants::client_header;
use tracing::{debug, instrument, warn};

use crate::batch;
use crate::credentials::TokenProvider;
use crate::traits::{Session, Transport};
use crate::types::{HttpRequest, HttpResponse, Method, TransportError};

/// Timeouts for [`ReqwestTransport`].
#[derive(Clone, Copy, Debug)]
pub struct ReqwestTransportConfig {
    /// Deadline for each request that does not set its own.
    pub timeout: Duration,
    /// Deadline for a whole batch call.
    pub batch_timeout: Duration,
}

impl Default for ReqwestTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15_000),
            batch_timeout: Duration::from_millis(10_000),
        }
    }
}

/// HTTP transport with a shared connection pool.
pub struct ReqwestTransport {
    client: reqwest::Client,
    credentials: Arc<dyn TokenProvider>,
    config: ReqwestTransportConfig,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Build the shared client.
    pub fn new(
        config: ReqwestTransportConfig,
        credentials: Arc<dyn TokenProvider>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client()?,
            credentials,
            config,
        })
    }
}

fn build_client() -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .user_agent(client_header())
        .build()
        .map_err(|e| TransportError::Connection {
            url: String::new(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Perform one request on `client`, attaching the bearer token.
async fn execute(
    client: &reqwest::Client,
    credentials: &dyn TokenProvider,
    request: HttpRequest,
    default_timeout: Duration,
) -> Result<HttpResponse, TransportError> {
    let token = credentials.access_token().await?;
    let timeout = request.timeout.unwrap_or(default_timeout);

    let mut builder = match request.method {
        Method::Get => client.get(&request.url),
        Method::Post => client.post(&request.url),
    }
    .bearer_auth(token)
    .timeout(timeout);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| map_reqwest_error(&request.url, timeout, &e))?;
    read_response(&request.url, timeout, response).await
}

async fn read_response(
    url: &str,
    timeout: Duration,
    response: reqwest::Response,
) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = response
        .text()
        .await
        .map_err(|e| map_reqwest_error(url, timeout, &e))?;
    Ok(HttpResponse {
        status,
        content_type,
        body,
    })
}

fn map_reqwest_error(url: &str, timeout: Duration, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis(),
        }
    } else {
        TransportError::Connection {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip_all, fields(url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("sending request");
        execute(&self.client, self.credentials.as_ref(), request, self.config.timeout).await
    }

    #[instrument(skip_all, fields(batch_url = %batch_url, parts = requests.len()))]
    async fn send_batch(
        &self,
        batch_url: &str,
        requests: Vec<HttpRequest>,
    ) -> Result<Vec<HttpResponse>, TransportError> {
        let token = self.credentials.access_token().await?;
        let boundary = batch::new_boundary();
        let body = batch::encode_batch(&requests, &boundary);
        let timeout = self.config.batch_timeout;

        let response = self
            .client
            .post(batch_url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, batch::content_type(&boundary))
            .timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(batch_url, timeout, &e))?;
        let response = read_response(batch_url, timeout, response).await?;

        let Some(reply_boundary) = response
            .content_type
            .as_deref()
            .and_then(batch::multipart_boundary)
            .map(String::from)
        else {
            warn!(status = response.status, "batch call rejected");
            return Err(TransportError::BatchRejected(response));
        };
        let parts = batch::decode_batch(&reply_boundary, &response.body)?;
        if parts.len() != requests.len() {
            return Err(TransportError::Malformed(format!(
                "expected {} parts, got {}",
                requests.len(),
                parts.len()
            )));
        }
        Ok(parts)
    }

    async fn open_session(&self) -> Result<Option<Arc<dyn Session>>, TransportError> {
        let session = ReqwestSession {
            client: build_client()?,
            credentials: Arc::clone(&self.credentials),
            timeout: self.config.timeout,
            closed: AtomicBool::new(false),
        };
        Ok(Some(Arc::new(session)))
    }
}

/// Dedicated connection pool for one fan-out call.
///
/// On TLS endpoints ALPN negotiates HTTP/2, so all sub-requests of the call
/// multiplex over one connection that is dropped with the session.
pub struct ReqwestSession {
    client: reqwest::Client,
    credentials: Arc<dyn TokenProvider>,
    timeout: Duration,
    closed: AtomicBool,
}

#[async_trait]
impl Session for ReqwestSession {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::SessionClosed);
        }
        execute(&self.client, self.credentials.as_ref(), request, self.timeout).await
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticToken;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(timeout: Duration) -> ReqwestTransport {
        ReqwestTransport::new(
            ReqwestTransportConfig {
                timeout,
                batch_timeout: timeout,
            },
            Arc::new(StaticToken::new("test-token")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn send_attaches_token_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/p/messages:send"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("x-client", "courier"))
            .and(body_json(json!({"message": {"token": "T"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        let req = HttpRequest::post(
            format!("{}/v1/projects/p/messages:send", server.uri()),
            json!({"message": {"token": "T"}}),
        )
        .with_header("X-Client", "courier");
        let res = transport(Duration::from_secs(5)).send(req).await.unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.data().unwrap()["name"], "m1");
    }

    #[tokio::test]
    async fn error_status_is_still_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let res = transport(Duration::from_secs(5))
            .send(HttpRequest::post(server.uri(), json!({})))
            .await
            .unwrap();
        assert_eq!(res.status, 503);
        assert!(!res.is_json());
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let result = transport(Duration::from_millis(50))
            .send(HttpRequest::post(server.uri(), json!({})))
            .await;
        assert_matches!(result, Err(TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn batch_reply_is_split_into_parts() {
        let server = MockServer::start().await;
        let reply = "--batch_r\r\nContent-Type: application/http\r\n\r\n\
            HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"name\":\"a\"}\r\n\
            --batch_r\r\nContent-Type: application/http\r\n\r\n\
            HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\n\r\n\
            {\"error\":{\"status\":\"NOT_FOUND\",\"message\":\"gone\"}}\r\n\
            --batch_r--\r\n";
        Mock::given(method("POST"))
            .and(path("/batch"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(reply, "multipart/mixed; boundary=batch_r"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let requests = vec![
            HttpRequest::post("https://fcm.example/send", json!({"message": {"token": "a"}})),
            HttpRequest::post("https://fcm.example/send", json!({"message": {"token": "b"}})),
        ];
        let parts = transport(Duration::from_secs(5))
            .send_batch(&format!("{}/batch", server.uri()), requests)
            .await
            .unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].status, 200);
        assert_eq!(parts[1].status, 404);
    }

    #[tokio::test]
    async fn non_multipart_batch_reply_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": {"status": "UNAUTHENTICATED", "message": "no"}})),
            )
            .mount(&server)
            .await;

        let result = transport(Duration::from_secs(5))
            .send_batch(&server.uri(), vec![HttpRequest::post("https://x", json!({}))])
            .await;
        assert_matches!(result, Err(TransportError::BatchRejected(res)) if res.status == 401);
    }

    #[tokio::test]
    async fn closed_session_refuses_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "s"})))
            .mount(&server)
            .await;

        let session = transport(Duration::from_secs(5)).open_session().await.unwrap().unwrap();
        let res = session
            .send(HttpRequest::post(server.uri(), json!({})))
            .await
            .unwrap();
        assert_eq!(res.status, 200);

        session.close();
        assert_matches!(
            session.send(HttpRequest::post(server.uri(), json!({}))).await,
            Err(TransportError::SessionClosed)
        );
    }
}
