//! Legacy `/fcm/send` API: device, device group, topic and condition sends.
//!
//! Payload and options are validated into their wire form, merged, and
//! addressed with `to`, `registration_ids` or `condition`. Options may be any
//! serializable value; pass `&MessagingOptions::default()` for none.

use courier_core::message::RegistrationTokens;
use courier_core::validate::legacy::{
    deep_extend, normalize_legacy_topic, validate_messaging_options, validate_messaging_payload,
    validate_registration_tokens,
};
use courier_core::{
    ErrorKind, MessagingConditionResponse, MessagingDeviceGroupResponse, MessagingDevicesResponse,
    MessagingError, MessagingTopicResponse, Result,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::messaging::Messaging;

const LEGACY_SEND_PATH: &str = "/fcm/send";

/// Recipient of a legacy send.
enum Recipient {
    To(String),
    RegistrationIds(Vec<String>),
    Condition(String),
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| MessagingError::invalid_argument(format!("{what} is not serializable: {e}")))
}

/// Validated payload deep-extended with validated options.
fn legacy_body(payload: Value, options: Value) -> Result<Map<String, Value>> {
    let Value::Object(mut body) = validate_messaging_payload(payload)? else {
        return Err(MessagingError::internal("validated payload is not an object"));
    };
    let Value::Object(options) = validate_messaging_options(options)? else {
        return Err(MessagingError::internal("validated options are not an object"));
    };
    deep_extend(&mut body, options);
    Ok(body)
}

fn has_multicast_id(data: &Value) -> bool {
    data.get("multicast_id").is_some()
}

impl Messaging {
    #[instrument(skip_all)]
    async fn send_legacy(
        &self,
        recipient: Recipient,
        payload: Value,
        options: Value,
    ) -> Result<Value> {
        let mut body = legacy_body(payload, options)?;
        let _ = match recipient {
            Recipient::To(to) => body.insert("to".into(), Value::String(to)),
            Recipient::RegistrationIds(ids) => body.insert("registration_ids".into(), ids.into()),
            Recipient::Condition(condition) => {
                body.insert("condition".into(), Value::String(condition))
            }
        };
        let url = format!("{}{LEGACY_SEND_PATH}", self.config.send_base_url);
        debug!("sending legacy request");
        self.handler.invoke(&url, Value::Object(body)).await
    }

    /// Send to one token (`to`) or several (`registration_ids`).
    ///
    /// A reply without `multicast_id` is reported with group counts and `-1`
    /// for the fields the backend did not send.
    pub async fn send_to_device(
        &self,
        tokens: impl Into<RegistrationTokens>,
        payload: &impl Serialize,
        options: &impl Serialize,
    ) -> Result<MessagingDevicesResponse> {
        let tokens = tokens.into();
        validate_registration_tokens(&tokens.as_list(), "sendToDevice", ErrorKind::InvalidRecipient)?;
        let recipient = match tokens {
            RegistrationTokens::One(token) => Recipient::To(token),
            RegistrationTokens::Many(tokens) => Recipient::RegistrationIds(tokens),
        };
        let data = self
            .send_legacy(recipient, to_json(payload, "payload")?, to_json(options, "options")?)
            .await?;
        if has_multicast_id(&data) {
            MessagingDevicesResponse::from_wire(&data)
        } else {
            MessagingDeviceGroupResponse::from_wire(&data).map(MessagingDevicesResponse::from_group_shaped)
        }
    }

    /// Send to the devices behind a notification key.
    pub async fn send_to_device_group(
        &self,
        notification_key: &str,
        payload: &impl Serialize,
        options: &impl Serialize,
    ) -> Result<MessagingDeviceGroupResponse> {
        if notification_key.is_empty() {
            return Err(MessagingError::invalid_recipient(
                "Notification key provided to sendToDeviceGroup() must be a non-empty string.",
            ));
        }
        if notification_key.contains(':') {
            return Err(MessagingError::invalid_recipient(
                "Notification key provided to sendToDeviceGroup() has the format of a \
                 registration token. You should use sendToDevice() instead.",
            ));
        }
        let data = self
            .send_legacy(
                Recipient::To(notification_key.to_string()),
                to_json(payload, "payload")?,
                to_json(options, "options")?,
            )
            .await?;
        if !has_multicast_id(&data) {
            return MessagingDeviceGroupResponse::from_wire(&data);
        }
        let devices = MessagingDevicesResponse::from_wire(&data)?;
        if devices.success_count == 0 {
            return Err(MessagingError::invalid_recipient(
                "Notification key provided to sendToDeviceGroup() is invalid.",
            ));
        }
        Ok(MessagingDeviceGroupResponse {
            success_count: devices.success_count,
            failure_count: devices.failure_count,
            failed_registration_tokens: Vec::new(),
        })
    }

    /// Send to everyone subscribed to `topic`.
    pub async fn send_to_topic(
        &self,
        topic: &str,
        payload: &impl Serialize,
        options: &impl Serialize,
    ) -> Result<MessagingTopicResponse> {
        let topic = normalize_legacy_topic(topic, "sendToTopic", ErrorKind::InvalidRecipient)?;
        let data = self
            .send_legacy(
                Recipient::To(topic),
                to_json(payload, "payload")?,
                to_json(options, "options")?,
            )
            .await?;
        MessagingTopicResponse::from_wire(&data)
    }

    /// Send to every device matching the topic `condition`.
    pub async fn send_to_condition(
        &self,
        condition: &str,
        payload: &impl Serialize,
        options: &impl Serialize,
    ) -> Result<MessagingConditionResponse> {
        if condition.is_empty() {
            return Err(MessagingError::invalid_recipient(
                "Condition provided to sendToCondition() must be a non-empty string.",
            ));
        }
        let data = self
            .send_legacy(
                Recipient::Condition(condition.replace('"', "'")),
                to_json(payload, "payload")?,
                to_json(options, "options")?,
            )
            .await?;
        MessagingConditionResponse::from_wire(&data)
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
    use courier_core::message::legacy::{MessagingOptions, MessagingPayload};
    use courier_transport::mock::{MockResponse, MockTransport, body_of};
    use serde_json::json;

    fn messaging(reply: Value) -> (Messaging, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, reply)));
        let m = Messaging::new(
            transport.clone(),
            Arc::new(StaticProjectId("p".into())),
            MessagingConfig::default(),
        );
        (m, transport)
    }

    fn payload() -> MessagingPayload {
        MessagingPayload {
            data: Some([("score".to_string(), "850".to_string())].into_iter().collect()),
            notification: None,
        }
    }

    #[tokio::test]
    async fn device_send_maps_devices_response() {
        let (m, transport) = messaging(json!({
            "multicast_id": 42,
            "success": 1,
            "failure": 1,
            "canonical_ids": 1,
            "results": [
                {"message_id": "0:1", "registration_id": "new-token"},
                {"error": "NotRegistered"}
            ]
        }));
        let options = MessagingOptions {
            dry_run: Some(true),
            ..MessagingOptions::default()
        };
        let response = m.send_to_device(vec!["a", "b"], &payload(), &options).await.unwrap();
        assert_eq!(response.multicast_id, 42);
        assert_eq!(response.success_count, 1);
        assert_eq!(response.canonical_registration_token_count, 1);
        assert_eq!(response.results[0].message_id.as_deref(), Some("0:1"));
        assert_eq!(
            response.results[0].canonical_registration_token.as_deref(),
            Some("new-token")
        );
        assert_eq!(
            response.results[1].error.as_ref().unwrap().kind(),
            ErrorKind::Unregistered
        );

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://fcm.googleapis.com/fcm/send");
        assert_eq!(
            body_of(request),
            json!({"data": {"score": "850"}, "dry_run": true, "registration_ids": ["a", "b"]})
        );
    }

    #[tokio::test]
    async fn single_device_uses_to_and_group_shaped_reply() {
        let (m, transport) = messaging(json!({"success": 2, "failure": 0}));
        let response = m
            .send_to_device("tok", &payload(), &MessagingOptions::default())
            .await
            .unwrap();
        assert_eq!(response.success_count, 2);
        assert_eq!(response.multicast_id, -1);
        assert_eq!(response.canonical_registration_token_count, -1);
        assert_eq!(body_of(&transport.requests()[0])["to"], "tok");
    }

    #[tokio::test]
    async fn device_send_rejects_bad_tokens() {
        let (m, transport) = messaging(json!({}));
        let empty: Vec<String> = Vec::new();
        let err = m
            .send_to_device(empty, &payload(), &MessagingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecipient);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn payload_and_options_are_validated() {
        let (m, transport) = messaging(json!({}));
        let err = m
            .send_to_device("t", &json!({"data": {"from": "x"}}), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);

        let err = m
            .send_to_device("t", &payload(), &json!({"to": "elsewhere"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOptions);

        let err = m
            .send_to_device("t", &payload(), &json!({"timeToLive": "soon"}))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("timeToLive"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn device_group_rules() {
        let (m, _) = messaging(json!({"success": 1, "failure": 1, "failed_registration_ids": ["x"]}));
        let opts = MessagingOptions::default();

        let response = m.send_to_device_group("key", &payload(), &opts).await.unwrap();
        assert_eq!(response.failed_registration_tokens, ["x"]);

        for bad in ["", "looks:like-a-token"] {
            let err = m.send_to_device_group(bad, &payload(), &opts).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRecipient);
        }
    }

    #[tokio::test]
    async fn device_group_with_multicast_reply() {
        let opts = MessagingOptions::default();
        let (m, _) = messaging(json!({"multicast_id": 7, "success": 0, "failure": 1}));
        let err = m.send_to_device_group("key", &payload(), &opts).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecipient);
        assert!(err.message().contains("is invalid"));

        let (m, _) = messaging(json!({"multicast_id": 7, "success": 3, "failure": 1}));
        let response = m.send_to_device_group("key", &payload(), &opts).await.unwrap();
        assert_eq!(response.success_count, 3);
        assert!(response.failed_registration_tokens.is_empty());
    }

    #[tokio::test]
    async fn topic_send_prefixes_topic() {
        let (m, transport) = messaging(json!({"message_id": 99}));
        let response = m
            .send_to_topic("news", &payload(), &MessagingOptions::default())
            .await
            .unwrap();
        assert_eq!(response.message_id, 99);
        assert_eq!(body_of(&transport.requests()[0])["to"], "/topics/news");

        let err = m
            .send_to_topic("bad topic", &payload(), &MessagingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecipient);
    }

    #[tokio::test]
    async fn condition_send_swaps_quotes() {
        let (m, transport) = messaging(json!({"message_id": 5}));
        let response = m
            .send_to_condition("\"a\" in topics", &payload(), &MessagingOptions::default())
            .await
            .unwrap();
        assert_eq!(response.message_id, 5);
        assert_eq!(body_of(&transport.requests()[0])["condition"], "'a' in topics");

        let err = m
            .send_to_condition("", &payload(), &MessagingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecipient);
    }

    #[tokio::test]
    async fn backend_error_is_raised() {
        let (m, _) = messaging(json!({"error": "InvalidRegistration"}));
        let err = m
            .send_to_device("t", &payload(), &MessagingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRegistration);
    }
}
