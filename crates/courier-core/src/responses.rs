//! Outcome value objects returned by the dispatcher.
//!
//! All of them are immutable once built. [`BatchResponse`] derives its counts
//! from the responses it holds, so `success_count + failure_count` always
//! equals the number of responses.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{MessagingError, Result};
use crate::key_map::{KeyTable, inverted, rename_keys};

// ─────────────────────────────────────────────────────────────────────────────
// Send responses
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one dispatched message.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<MessagingError>,
}

impl SendResponse {
    /// Successful delivery with the backend-issued id.
    pub fn success(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    /// Failed delivery.
    pub fn failure(error: MessagingError) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error),
        }
    }

    /// Whether the backend accepted the message.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Backend message id, on success.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Failure reason.
    pub fn error(&self) -> Option<&MessagingError> {
        self.error.as_ref()
    }
}

impl From<Result<String>> for SendResponse {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(id) => Self::success(id),
            Err(err) => Self::failure(err),
        }
    }
}

/// Ordered outcomes of a fan-out or batch send.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    responses: Vec<SendResponse>,
    success_count: usize,
    failure_count: usize,
}

impl BatchResponse {
    /// Build from outcomes in input order.
    pub fn from_responses(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.is_success()).count();
        let failure_count = responses.len() - success_count;
        Self {
            responses,
            success_count,
            failure_count,
        }
    }

    /// Outcomes, positionally matched to the input messages.
    pub fn responses(&self) -> &[SendResponse] {
        &self.responses
    }

    /// Number of accepted messages.
    pub fn success_count(&self) -> usize {
        self.success_count
    }

    /// Number of failed messages.
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    /// Consume into the outcome list.
    pub fn into_responses(self) -> Vec<SendResponse> {
        self.responses
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Topic management
// ─────────────────────────────────────────────────────────────────────────────

/// Failure for one token of a topic management call.
#[derive(Clone, Debug, Serialize)]
pub struct TopicManagementError {
    /// Position of the token in the request.
    pub index: usize,
    /// Why the token failed.
    pub error: MessagingError,
}

/// Outcome of a subscribe or unsubscribe call.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicManagementResponse {
    success_count: usize,
    failure_count: usize,
    errors: Vec<TopicManagementError>,
}

impl TopicManagementResponse {
    /// Map the backend's `{"results": [...]}` body.
    ///
    /// Every entry carrying an `error` is a failure at that index; anything
    /// else is a success. A body without `results` counts nothing.
    pub fn from_wire(body: &Value) -> Self {
        let results = body.get("results").and_then(Value::as_array).map_or(&[][..], Vec::as_slice);
        let errors: Vec<TopicManagementError> = results
            .iter()
            .enumerate()
            .filter_map(|(index, result)| {
                let raw = result.get("error")?;
                Some(TopicManagementError {
                    index,
                    error: MessagingError::from_topic_management_server_error(
                        raw.as_str(),
                        None,
                        Some(raw),
                    ),
                })
            })
            .collect();
        Self {
            success_count: results.len() - errors.len(),
            failure_count: errors.len(),
            errors,
        }
    }

    /// Tokens that were (un)subscribed.
    pub fn success_count(&self) -> usize {
        self.success_count
    }

    /// Tokens that failed.
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    /// Per-token failures, in request order.
    pub fn errors(&self) -> &[TopicManagementError] {
        &self.errors
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Legacy responses
// ─────────────────────────────────────────────────────────────────────────────

/// Legacy devices response names (idiomatic → wire).
pub const DEVICES_RESPONSE_KEYS: KeyTable = &[
    ("canonicalRegistrationTokenCount", "canonical_ids"),
    ("failureCount", "failure"),
    ("successCount", "success"),
    ("multicastId", "multicast_id"),
];

/// Legacy per-device result names (idiomatic → wire).
pub const DEVICE_RESULT_KEYS: KeyTable = &[
    ("messageId", "message_id"),
    ("canonicalRegistrationToken", "registration_id"),
];

/// Legacy device group response names (idiomatic → wire).
pub const DEVICE_GROUP_RESPONSE_KEYS: KeyTable = &[
    ("successCount", "success"),
    ("failureCount", "failure"),
    ("failedRegistrationTokens", "failed_registration_ids"),
];

/// Legacy topic and condition response names (idiomatic → wire).
pub const MESSAGE_ID_RESPONSE_KEYS: KeyTable = &[("messageId", "message_id")];

/// Outcome for one device of a legacy send.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingDeviceResult {
    /// Backend message id, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Replacement token the caller should store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_registration_token: Option<String>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MessagingError>,
}

/// Legacy `sendToDevice` response.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingDevicesResponse {
    /// Results carrying a canonical token.
    pub canonical_registration_token_count: i64,
    /// Devices the message could not reach.
    pub failure_count: i64,
    /// Devices the message was accepted for.
    pub success_count: i64,
    /// Backend multicast id, `-1` when the backend answered as a device group.
    pub multicast_id: i64,
    /// Per-device outcomes in request order.
    pub results: Vec<MessagingDeviceResult>,
}

/// Legacy `sendToDeviceGroup` response.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingDeviceGroupResponse {
    /// Group members the message was accepted for.
    pub success_count: i64,
    /// Group members that failed.
    pub failure_count: i64,
    /// Group members the message could not reach.
    pub failed_registration_tokens: Vec<String>,
}

/// Legacy `sendToTopic` response.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingTopicResponse {
    /// Backend message id.
    pub message_id: i64,
}

/// Legacy `sendToCondition` response.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingConditionResponse {
    /// Backend message id.
    pub message_id: i64,
}

/// Rename a wire object to idiomatic names.
fn to_idiomatic(body: &Value, table: KeyTable) -> Result<Map<String, Value>> {
    let mut obj = body.as_object().cloned().ok_or_else(|| {
        MessagingError::internal(format!("unexpected response from the backend: {body}"))
    })?;
    rename_keys(&mut obj, &inverted(table))
        .map_err(|conflict| MessagingError::internal(conflict.to_string()))?;
    Ok(obj)
}

fn int_field(obj: &Map<String, Value>, key: &str) -> i64 {
    obj.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

impl MessagingDevicesResponse {
    /// Map a devices-shaped backend body.
    pub fn from_wire(body: &Value) -> Result<Self> {
        let obj = to_idiomatic(body, DEVICES_RESPONSE_KEYS)?;
        let results = obj
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().map(MessagingDeviceResult::from_wire).collect::<Result<_>>())
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            canonical_registration_token_count: int_field(&obj, "canonicalRegistrationTokenCount"),
            failure_count: int_field(&obj, "failureCount"),
            success_count: int_field(&obj, "successCount"),
            multicast_id: int_field(&obj, "multicastId"),
            results,
        })
    }

    /// Devices response carrying a group-shaped body: unknown fields are `-1`.
    pub fn from_group_shaped(group: MessagingDeviceGroupResponse) -> Self {
        Self {
            canonical_registration_token_count: -1,
            failure_count: group.failure_count,
            success_count: group.success_count,
            multicast_id: -1,
            results: Vec::new(),
        }
    }
}

impl MessagingDeviceResult {
    fn from_wire(result: &Value) -> Result<Self> {
        let obj = to_idiomatic(result, DEVICE_RESULT_KEYS)?;
        let message_id = obj.get("messageId").map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        let error = obj.get("error").map(|raw| {
            MessagingError::from_server_error(raw.as_str(), None, Some(raw))
        });
        Ok(Self {
            message_id,
            canonical_registration_token: string_field(&obj, "canonicalRegistrationToken"),
            error,
        })
    }
}

impl MessagingDeviceGroupResponse {
    /// Map a group-shaped backend body. Missing failed tokens become empty.
    pub fn from_wire(body: &Value) -> Result<Self> {
        let obj = to_idiomatic(body, DEVICE_GROUP_RESPONSE_KEYS)?;
        let failed_registration_tokens = obj
            .get("failedRegistrationTokens")
            .and_then(Value::as_array)
            .map(|tokens| tokens.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        Ok(Self {
            success_count: int_field(&obj, "successCount"),
            failure_count: int_field(&obj, "failureCount"),
            failed_registration_tokens,
        })
    }
}

impl MessagingTopicResponse {
    /// Map a topic send body.
    pub fn from_wire(body: &Value) -> Result<Self> {
        let obj = to_idiomatic(body, MESSAGE_ID_RESPONSE_KEYS)?;
        Ok(Self {
            message_id: int_field(&obj, "messageId"),
        })
    }
}

impl MessagingConditionResponse {
    /// Map a condition send body.
    pub fn from_wire(body: &Value) -> Result<Self> {
        let obj = to_idiomatic(body, MESSAGE_ID_RESPONSE_KEYS)?;
        Ok(Self {
            message_id: int_field(&obj, "messageId"),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn batch_counts_are_derived() {
        let batch = BatchResponse::from_responses(vec![
            SendResponse::success("a"),
            SendResponse::failure(MessagingError::internal("x")),
            SendResponse::success("b"),
        ]);
        assert_eq!(batch.success_count(), 2);
        assert_eq!(batch.failure_count(), 1);
        assert_eq!(batch.success_count() + batch.failure_count(), batch.responses().len());
        assert_eq!(batch.responses()[2].message_id(), Some("b"));
    }

    #[test]
    fn send_response_from_result() {
        let ok = SendResponse::from(Ok("id".to_string()));
        assert!(ok.is_success());
        let failed = SendResponse::from(Err(MessagingError::internal("boom")));
        assert!(!failed.is_success());
        assert_eq!(failed.error().unwrap().kind(), ErrorKind::Internal);
    }

    #[test]
    fn batch_serializes_camel_case() {
        let batch = BatchResponse::from_responses(vec![SendResponse::success("m1")]);
        let v = serde_json::to_value(&batch).unwrap();
        assert_eq!(v["successCount"], 1);
        assert_eq!(v["responses"][0], json!({"success": true, "messageId": "m1"}));
    }

    #[test]
    fn topic_management_maps_errors_by_index() {
        let res = TopicManagementResponse::from_wire(&json!({
            "results": [{}, {"error": "NOT_FOUND"}, {}]
        }));
        assert_eq!(res.success_count(), 2);
        assert_eq!(res.failure_count(), 1);
        assert_eq!(res.errors()[0].index, 1);
        assert_eq!(res.errors()[0].error.kind(), ErrorKind::Unregistered);
    }

    #[test]
    fn topic_management_without_results() {
        let res = TopicManagementResponse::from_wire(&json!({}));
        assert_eq!(res.success_count(), 0);
        assert!(res.errors().is_empty());
    }

    #[test]
    fn devices_response_renamed_and_errors_mapped() {
        let res = MessagingDevicesResponse::from_wire(&json!({
            "multicast_id": 7,
            "success": 1,
            "failure": 1,
            "canonical_ids": 1,
            "results": [
                {"message_id": "0:1", "registration_id": "new"},
                {"error": "NotRegistered"}
            ]
        }))
        .unwrap();
        assert_eq!(res.multicast_id, 7);
        assert_eq!(res.canonical_registration_token_count, 1);
        assert_eq!(res.results[0].message_id.as_deref(), Some("0:1"));
        assert_eq!(res.results[0].canonical_registration_token.as_deref(), Some("new"));
        assert_eq!(res.results[1].error.as_ref().unwrap().kind(), ErrorKind::Unregistered);
    }

    #[test]
    fn group_response_defaults_failed_tokens() {
        let res = MessagingDeviceGroupResponse::from_wire(&json!({"success": 2, "failure": 0})).unwrap();
        assert_eq!(res.success_count, 2);
        assert!(res.failed_registration_tokens.is_empty());

        let devices = MessagingDevicesResponse::from_group_shaped(res);
        assert_eq!(devices.multicast_id, -1);
        assert_eq!(devices.canonical_registration_token_count, -1);
    }

    #[test]
    fn topic_response_message_id() {
        let res = MessagingTopicResponse::from_wire(&json!({"message_id": 123})).unwrap();
        assert_eq!(res.message_id, 123);
        assert!(MessagingConditionResponse::from_wire(&json!("nope")).is_err());
    }
}
