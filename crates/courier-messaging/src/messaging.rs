//! The dispatcher: validation, endpoint resolution, dispatch, aggregation.
//!
//! Every operation serializes the caller's message into its own JSON copy
//! before validating it, so callers never observe mutation and concurrent
//! calls share nothing but the cached endpoint path.

use std::sync::Arc;
use std::time::Duration;

use courier_core::constants::MAX_BATCH_SIZE;
use courier_core::logging::token_prefix;
use courier_core::validate::validate_message;
use courier_core::{BatchResponse, MessagingError, Result, SendResponse};
use courier_settings::MessagingSettings;
use courier_transport::{
    ReqwestTransport, ReqwestTransportConfig, Session, TokenProvider, Transport,
};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::project::{EnvProjectId, ProjectIdChain, ProjectIdResolver, StaticProjectId};
use crate::request_handler::RequestHandler;

/// Endpoints and dispatch behaviour of a [`Messaging`] instance.
#[derive(Clone, Debug)]
pub struct MessagingConfig {
    /// Base URL of the send endpoints.
    pub send_base_url: String,
    /// Base URL of the topic management endpoints.
    pub topic_management_base_url: String,
    /// URL of the multipart batch endpoint.
    pub batch_url: String,
    /// Deadline for each request.
    pub timeout: Duration,
    /// Fan out on the shared client instead of a per-call session.
    pub legacy_http_transport: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self::from(&MessagingSettings::default())
    }
}

impl From<&MessagingSettings> for MessagingConfig {
    fn from(settings: &MessagingSettings) -> Self {
        Self {
            send_base_url: settings.send_base_url.trim_end_matches('/').to_string(),
            topic_management_base_url: settings
                .topic_management_base_url
                .trim_end_matches('/')
                .to_string(),
            batch_url: settings.batch_url.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
            legacy_http_transport: settings.legacy_http_transport,
        }
    }
}

/// Push notification dispatcher.
pub struct Messaging {
    pub(crate) handler: Arc<RequestHandler>,
    pub(crate) config: MessagingConfig,
    project: Arc<dyn ProjectIdResolver>,
    url_path: OnceCell<String>,
}

/// Closes the session once every holder is gone.
struct SessionGuard(Arc<dyn Session>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
        debug!("fan-out session closed");
    }
}

impl Messaging {
    /// Dispatcher over `transport`, resolving the project id through `project`.
    pub fn new(
        transport: Arc<dyn Transport>,
        project: Arc<dyn ProjectIdResolver>,
        config: MessagingConfig,
    ) -> Self {
        Self {
            handler: Arc::new(RequestHandler::new(transport, config.timeout)),
            config,
            project,
            url_path: OnceCell::new(),
        }
    }

    /// Dispatcher over a [`ReqwestTransport`] configured from `settings`.
    ///
    /// The project id comes from the settings when set, else from the
    /// environment.
    pub fn from_settings(
        settings: &MessagingSettings,
        credentials: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(
            ReqwestTransportConfig {
                timeout: Duration::from_millis(settings.timeout_ms),
                batch_timeout: Duration::from_millis(settings.batch_timeout_ms),
            },
            credentials,
        )?;
        let mut project = ProjectIdChain::new();
        if let Some(id) = &settings.project_id {
            project = project.with(Arc::new(StaticProjectId(id.clone())));
        }
        let project = project.with(Arc::new(EnvProjectId::new()));
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(project),
            MessagingConfig::from(settings),
        ))
    }

    /// `/v1/projects/{id}/messages:send`, resolved on first use.
    async fn url_path(&self) -> Result<&str> {
        self.url_path
            .get_or_try_init(|| async {
                let project_id = self.project.project_id().await.ok_or_else(|| {
                    MessagingError::configuration(
                        "Failed to determine project ID for Messaging. Set a project id in \
                         the settings or the GOOGLE_CLOUD_PROJECT environment variable.",
                    )
                })?;
                debug!(project_id = %project_id, "resolved send endpoint");
                Ok::<_, MessagingError>(format!("/v1/projects/{project_id}/messages:send"))
            })
            .await
            .map(String::as_str)
    }

    async fn send_url(&self) -> Result<String> {
        let path = self.url_path().await?;
        Ok(format!("{}{path}", self.config.send_base_url))
    }

    // ── single send ─────────────────────────────────────────────────

    /// Send one message and return the backend message id.
    ///
    /// With `dry_run` the backend validates without delivering.
    #[instrument(skip_all, fields(dry_run = dry_run))]
    pub async fn send<M: Serialize>(&self, message: &M, dry_run: bool) -> Result<String> {
        let wire = validate_message(to_json(message)?)?;
        let url = self.send_url().await?;
        let data = self.handler.invoke(&url, request_body(wire, dry_run)).await?;
        data.get("name")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| MessagingError::internal(format!("send response without a name: {data}")))
    }

    // ── fan-out ─────────────────────────────────────────────────────

    /// Send each message in its own request, concurrently.
    ///
    /// A failing message only fails its own entry; the call returns once
    /// every request has settled, with responses in input order.
    #[instrument(skip_all, fields(count = messages.len(), dry_run = dry_run))]
    pub async fn send_each<M: Serialize>(&self, messages: &[M], dry_run: bool) -> Result<BatchResponse> {
        check_batch_len(messages.len(), "messages")?;
        let copies: Vec<Result<Value>> = messages.iter().map(to_json).collect();
        let url = Arc::new(self.send_url().await?);

        let session = if self.config.legacy_http_transport {
            None
        } else {
            self.handler
                .transport()
                .open_session()
                .await?
                .map(|session| Arc::new(SessionGuard(session)))
        };

        let tasks: Vec<_> = copies
            .into_iter()
            .map(|copy| {
                let handler = Arc::clone(&self.handler);
                let session = session.clone();
                let url = Arc::clone(&url);
                tokio::spawn(async move {
                    let wire = match copy.and_then(validate_message) {
                        Ok(wire) => wire,
                        Err(err) => return SendResponse::failure(err),
                    };
                    let session = session.as_ref().map(|guard| guard.0.as_ref());
                    handler
                        .invoke_for_send_response(&url, request_body(wire, dry_run), session)
                        .await
                })
            })
            .collect();

        let responses: Vec<SendResponse> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    SendResponse::failure(MessagingError::internal(format!("send task failed: {e}")))
                })
            })
            .collect();
        drop(session);

        let batch = BatchResponse::from_responses(responses);
        info!(
            success = batch.success_count(),
            failure = batch.failure_count(),
            "send_each complete"
        );
        Ok(batch)
    }

    /// Send one message template to every token of `message.tokens`.
    pub async fn send_each_for_multicast<M: Serialize>(
        &self,
        message: &M,
        dry_run: bool,
    ) -> Result<BatchResponse> {
        let copies = expand_multicast(to_json(message)?)?;
        self.send_each(&copies, dry_run).await
    }

    // ── batch ───────────────────────────────────────────────────────

    /// Send all messages in a single multipart batch call.
    ///
    /// Any invalid message fails the whole call before I/O. A failure of the
    /// batch call itself is returned as an error rather than a report.
    #[instrument(skip_all, fields(count = messages.len(), dry_run = dry_run))]
    pub async fn send_all<M: Serialize>(&self, messages: &[M], dry_run: bool) -> Result<BatchResponse> {
        check_batch_len(messages.len(), "messages")?;
        let wires = messages
            .iter()
            .map(|m| to_json(m).and_then(validate_message))
            .collect::<Result<Vec<_>>>()?;
        let url = self.send_url().await?;

        let requests = wires
            .into_iter()
            .map(|wire| (url.clone(), request_body(wire, dry_run)))
            .collect();
        let batch = self.handler.invoke_batch(&self.config.batch_url, requests).await?;
        info!(
            success = batch.success_count(),
            failure = batch.failure_count(),
            "send_all complete"
        );
        Ok(batch)
    }

    /// Multicast over a single batch call.
    pub async fn send_multicast<M: Serialize>(&self, message: &M, dry_run: bool) -> Result<BatchResponse> {
        let copies = expand_multicast(to_json(message)?)?;
        self.send_all(&copies, dry_run).await
    }
}

// ── helpers ─────────────────────────────────────────────────────────────────

fn to_json<M: Serialize>(message: &M) -> Result<Value> {
    serde_json::to_value(message)
        .map_err(|e| MessagingError::invalid_argument(format!("message is not serializable: {e}")))
}

fn request_body(message: Value, dry_run: bool) -> Value {
    let mut body = json!({ "message": message });
    if dry_run {
        body["validate_only"] = Value::Bool(true);
    }
    body
}

fn check_batch_len(len: usize, what: &str) -> Result<()> {
    if len == 0 {
        return Err(MessagingError::invalid_argument(format!(
            "{what} must be a non-empty array"
        )));
    }
    if len > MAX_BATCH_SIZE {
        return Err(MessagingError::invalid_argument(format!(
            "{what} list must not contain more than {MAX_BATCH_SIZE} items"
        )));
    }
    Ok(())
}

/// Fields of a multicast message carried into every per-token message.
pub const MULTICAST_COPIED_FIELDS: [&str; 6] =
    ["android", "apns", "data", "fcmOptions", "notification", "webpush"];

/// One message per token carrying the shared fields plus `token`.
///
/// Anything outside [`MULTICAST_COPIED_FIELDS`] is dropped.
pub fn expand_multicast(message: Value) -> Result<Vec<Value>> {
    let Value::Object(mut multicast) = message else {
        return Err(MessagingError::invalid_argument(
            "MulticastMessage must be a non-null object",
        ));
    };
    let Some(Value::Array(tokens)) = multicast.remove("tokens") else {
        return Err(MessagingError::invalid_argument("tokens must be a non-empty array"));
    };
    check_batch_len(tokens.len(), "tokens")?;
    let template: Map<String, Value> = multicast
        .into_iter()
        .filter(|(key, _)| MULTICAST_COPIED_FIELDS.contains(&key.as_str()))
        .collect();

    let first = tokens.first().and_then(Value::as_str).map(token_prefix);
    debug!(first, count = tokens.len(), "expanding multicast");
    Ok(tokens
        .into_iter()
        .map(|token| {
            let mut message = template.clone();
            let _ = message.insert("token".into(), token);
            Value::Object(message)
        })
        .collect())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::StaticProjectId;
    use courier_core::ErrorKind;
    use courier_core::message::{Message, MulticastMessage, Notification};
    use courier_transport::mock::{MockResponse, MockTransport, body_of};

    fn messaging(transport: MockTransport) -> (Messaging, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let messaging = Messaging::new(
            transport.clone(),
            Arc::new(StaticProjectId("proj".into())),
            MessagingConfig::default(),
        );
        (messaging, transport)
    }

    #[tokio::test]
    async fn send_posts_validated_message() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("msg123")));
        let message = Message::to_token("T").with_notification(Notification::titled("Hi"));
        assert_eq!(m.send(&message, false).await.unwrap(), "msg123");

        let request = &transport.requests()[0];
        assert_eq!(
            request.url,
            "https://fcm.googleapis.com/v1/projects/proj/messages:send"
        );
        assert_eq!(
            body_of(request),
            json!({"message": {"token": "T", "notification": {"title": "Hi"}}})
        );
    }

    #[tokio::test]
    async fn dry_run_sets_validate_only() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("m")));
        let _ = m.send(&json!({"topic": "news"}), true).await.unwrap();
        assert_eq!(body_of(&transport.requests()[0])["validate_only"], true);

        let _ = m.send(&json!({"topic": "news"}), false).await.unwrap();
        assert!(body_of(&transport.requests()[1]).get("validate_only").is_none());
    }

    #[tokio::test]
    async fn invalid_message_fails_before_io() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("m")));
        let err = m.send(&json!({"token": "a", "topic": "b"}), false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn missing_project_id_is_a_configuration_error() {
        let transport = Arc::new(MockTransport::always(MockResponse::message_id("m")));
        let m = Messaging::new(
            transport.clone(),
            Arc::new(StaticProjectId(String::new())),
            MessagingConfig::default(),
        );
        let err = m.send(&json!({"token": "T"}), false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn send_each_keeps_order_under_reordered_completion() {
        let (m, _) = messaging(MockTransport::new(|req| {
            let token = body_of(req)["message"]["token"].as_str().unwrap_or_default().to_string();
            let delay = if token == "first" { 40 } else { 0 };
            MockResponse::delayed(Duration::from_millis(delay), MockResponse::message_id(&token))
        }));
        let batch = m
            .send_each(&[json!({"token": "first"}), json!({"token": "second"})], false)
            .await
            .unwrap();
        let ids: Vec<_> = batch.responses().iter().map(|r| r.message_id().unwrap()).collect();
        assert_eq!(ids, ["first", "second"]);
    }

    #[tokio::test]
    async fn send_each_isolates_malformed_message() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("ok")));
        let messages = vec![
            json!({"token": "a"}),
            json!({"token": "b", "data": {"k": 1}}),
            json!({"token": "c"}),
        ];
        let batch = m.send_each(&messages, false).await.unwrap();
        assert_eq!(batch.responses().len(), 3);
        assert_eq!(batch.success_count(), 2);
        let failed = &batch.responses()[1];
        assert!(!failed.is_success());
        assert_eq!(failed.error().unwrap().field(), Some("data.k"));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn send_each_rejects_bad_lengths_without_io() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("ok")).with_sessions());
        let empty: Vec<Value> = Vec::new();
        assert_eq!(
            m.send_each(&empty, false).await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let too_many = vec![json!({"token": "t"}); 501];
        assert_eq!(
            m.send_each(&too_many, false).await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(transport.request_count(), 0);
        assert_eq!(transport.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn send_each_uses_one_session_and_closes_it_once() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("ok")).with_sessions());
        let messages = vec![json!({"token": "a"}), json!({"token": "b"}), json!({"token": "c"})];
        let batch = m.send_each(&messages, false).await.unwrap();
        assert_eq!(batch.success_count(), 3);
        assert_eq!(transport.sessions_opened(), 1);
        assert_eq!(transport.sessions_closed(), 1);
        assert_eq!(transport.session_request_count(), 3);
    }

    #[tokio::test]
    async fn session_closed_even_when_every_message_is_invalid() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("ok")).with_sessions());
        let batch = m.send_each(&[json!({}), json!({"data": {}})], false).await.unwrap();
        assert_eq!(batch.failure_count(), 2);
        assert_eq!(transport.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn legacy_transport_skips_session() {
        let transport = Arc::new(MockTransport::always(MockResponse::message_id("ok")).with_sessions());
        let config = MessagingConfig {
            legacy_http_transport: true,
            ..MessagingConfig::default()
        };
        let m = Messaging::new(transport.clone(), Arc::new(StaticProjectId("p".into())), config);
        let _ = m.send_each(&[json!({"token": "a"})], false).await.unwrap();
        assert_eq!(transport.sessions_opened(), 0);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn multicast_expands_tokens_in_order() {
        let (m, transport) = messaging(MockTransport::new(|req| {
            if body_of(req)["message"]["token"] == "B" {
                MockResponse::error(404, "NOT_FOUND", "not registered")
            } else {
                MockResponse::message_id("ok-A")
            }
        }));
        let message = MulticastMessage {
            tokens: vec!["A".into(), "B".into()],
            data: Some([("k".to_string(), "v".to_string())].into_iter().collect()),
            ..MulticastMessage::default()
        };
        let batch = m.send_each_for_multicast(&message, false).await.unwrap();
        assert_eq!(batch.success_count(), 1);
        assert_eq!(batch.failure_count(), 1);
        assert_eq!(batch.responses()[0].message_id(), Some("ok-A"));
        assert_eq!(
            batch.responses()[1].error().unwrap().kind(),
            ErrorKind::Unregistered
        );
        for request in transport.requests() {
            assert_eq!(body_of(&request)["message"]["data"], json!({"k": "v"}));
        }
    }

    #[test]
    fn expand_multicast_rules() {
        let copies = expand_multicast(json!({
            "tokens": ["a", "b"],
            "data": {"k": "v"},
            "fcmOptions": {"analyticsLabel": "l"},
        }))
        .unwrap();
        assert_eq!(
            copies[1],
            json!({"token": "b", "data": {"k": "v"}, "fcmOptions": {"analyticsLabel": "l"}})
        );

        for bad in [json!(null), json!({"tokens": []}), json!({"tokens": "a"}), json!({})] {
            assert_eq!(expand_multicast(bad).unwrap_err().kind(), ErrorKind::InvalidArgument);
        }
        let many: Vec<String> = (0..501).map(|i| format!("t{i}")).collect();
        assert!(expand_multicast(json!({"tokens": many})).is_err());
    }

    #[test]
    fn expand_multicast_drops_fields_outside_the_template() {
        let copies = expand_multicast(json!({
            "tokens": ["a"],
            "topic": "news",
            "condition": "'x' in topics",
            "notification": {"title": "t"},
        }))
        .unwrap();
        assert_eq!(copies, [json!({"token": "a", "notification": {"title": "t"}})]);
    }

    #[tokio::test]
    async fn send_all_uses_one_batch_call() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("b")));
        let batch = m
            .send_all(&[json!({"token": "a"}), json!({"topic": "/topics/t"})], true)
            .await
            .unwrap();
        assert_eq!(batch.success_count(), 2);
        let batches = transport.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, "https://fcm.googleapis.com/batch");
        assert_eq!(body_of(&batches[0].1[1])["message"]["topic"], "t");
        assert_eq!(body_of(&batches[0].1[1])["validate_only"], true);
    }

    #[tokio::test]
    async fn send_all_fails_whole_call_on_invalid_message() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("b")));
        let err = m
            .send_all(&[json!({"token": "a"}), json!({"token": "b", "topic": "c"})], false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        assert!(transport.batches().is_empty());
    }

    #[tokio::test]
    async fn send_multicast_goes_through_batch() {
        let (m, transport) = messaging(MockTransport::always(MockResponse::message_id("b")));
        let batch = m
            .send_multicast(&json!({"tokens": ["x", "y", "z"]}), false)
            .await
            .unwrap();
        assert_eq!(batch.responses().len(), 3);
        assert_eq!(transport.batches()[0].1.len(), 3);
    }

    #[tokio::test]
    async fn endpoint_is_resolved_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(AtomicUsize);

        #[async_trait::async_trait]
        impl ProjectIdResolver for Counting {
            async fn project_id(&self) -> Option<String> {
                let _ = self.0.fetch_add(1, Ordering::SeqCst);
                Some("p".into())
            }
        }

        let resolver = Arc::new(Counting(AtomicUsize::new(0)));
        let m = Messaging::new(
            Arc::new(MockTransport::always(MockResponse::message_id("m"))),
            resolver.clone(),
            MessagingConfig::default(),
        );
        for _ in 0..3 {
            let _ = m.send(&json!({"token": "t"}), false).await.unwrap();
        }
        assert_eq!(resolver.0.load(Ordering::SeqCst), 1);
    }
}
