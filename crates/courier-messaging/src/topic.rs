//! Topic subscription management.

use courier_core::message::RegistrationTokens;
use courier_core::validate::legacy::{normalize_legacy_topic, validate_registration_tokens};
use courier_core::{ErrorKind, Result, TopicManagementResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::messaging::Messaging;

#[derive(Clone, Copy, Debug)]
enum TopicOp {
    Subscribe,
    Unsubscribe,
}

impl TopicOp {
    fn method(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribeToTopic",
            Self::Unsubscribe => "unsubscribeFromTopic",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Subscribe => "/iid/v1:batchAdd",
            Self::Unsubscribe => "/iid/v1:batchRemove",
        }
    }
}

impl Messaging {
    /// Subscribe one or more registration tokens to `topic`.
    pub async fn subscribe_to_topic(
        &self,
        tokens: impl Into<RegistrationTokens>,
        topic: &str,
    ) -> Result<TopicManagementResponse> {
        self.manage_topic(TopicOp::Subscribe, tokens.into(), topic).await
    }

    /// Unsubscribe one or more registration tokens from `topic`.
    pub async fn unsubscribe_from_topic(
        &self,
        tokens: impl Into<RegistrationTokens>,
        topic: &str,
    ) -> Result<TopicManagementResponse> {
        self.manage_topic(TopicOp::Unsubscribe, tokens.into(), topic).await
    }

    #[instrument(skip_all, fields(op = op.method(), topic = %topic))]
    async fn manage_topic(
        &self,
        op: TopicOp,
        tokens: RegistrationTokens,
        topic: &str,
    ) -> Result<TopicManagementResponse> {
        validate_registration_tokens(&tokens.as_list(), op.method(), ErrorKind::InvalidArgument)?;
        let topic = normalize_legacy_topic(topic, op.method(), ErrorKind::InvalidArgument)?;

        let url = format!("{}{}", self.config.topic_management_base_url, op.path());
        let body = json!({
            "to": topic,
            "registration_tokens": tokens.into_list(),
        });
        let data = self.handler.invoke(&url, body).await?;
        let response = TopicManagementResponse::from_wire(&data);
        info!(
            success = response.success_count(),
            failure = response.failure_count(),
            "topic management complete"
        );
        Ok(response)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::messaging::MessagingConfig;
    use crate::project::StaticProjectId;
    use courier_transport::mock::{MockResponse, MockTransport, body_of};
    use serde_json::Value;

    fn messaging(reply: Value) -> (Messaging, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, reply)));
        let m = Messaging::new(
            transport.clone(),
            Arc::new(StaticProjectId("p".into())),
            MessagingConfig::default(),
        );
        (m, transport)
    }

    #[tokio::test]
    async fn subscribe_reports_per_token_failures() {
        let (m, transport) = messaging(json!({"results": [{}, {"error": "NOT_FOUND"}]}));
        let response = m.subscribe_to_topic(vec!["tok1", "tok2"], "news").await.unwrap();
        assert_eq!(response.success_count(), 1);
        assert_eq!(response.failure_count(), 1);
        assert_eq!(response.errors()[0].index, 1);
        assert_eq!(response.errors()[0].error.kind(), ErrorKind::Unregistered);

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://iid.googleapis.com/iid/v1:batchAdd");
        assert_eq!(
            body_of(request),
            json!({"to": "/topics/news", "registration_tokens": ["tok1", "tok2"]})
        );
    }

    #[tokio::test]
    async fn unsubscribe_single_token() {
        let (m, transport) = messaging(json!({"results": [{}]}));
        let response = m.unsubscribe_from_topic("tok", "/topics/news").await.unwrap();
        assert_eq!(response.success_count(), 1);
        let request = &transport.requests()[0];
        assert!(request.url.ends_with(":batchRemove"));
        assert_eq!(body_of(request)["to"], "/topics/news");
        assert_eq!(body_of(request)["registration_tokens"], json!(["tok"]));
    }

    #[tokio::test]
    async fn rejects_bad_input_without_io() {
        let (m, transport) = messaging(json!({"results": []}));

        let empty: Vec<String> = Vec::new();
        let err = m.subscribe_to_topic(empty, "news").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let too_many: Vec<String> = (0..1001).map(|i| format!("t{i}")).collect();
        assert!(m.subscribe_to_topic(too_many, "news").await.is_err());

        let err = m.subscribe_to_topic(vec!["a", ""], "news").await.unwrap_err();
        assert!(err.message().contains("index 1"));

        let err = m.subscribe_to_topic("a", "bad topic!").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(m.subscribe_to_topic("a", "").await.is_err());

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn request_level_error_is_raised() {
        let transport = Arc::new(MockTransport::always(MockResponse::error(
            403,
            "PERMISSION_DENIED",
            "no access",
        )));
        let m = Messaging::new(
            transport,
            Arc::new(StaticProjectId("p".into())),
            MessagingConfig::default(),
        );
        assert!(m.subscribe_to_topic("a", "news").await.is_err());
    }
}
