//! Schema validation and normalization.
//!
//! [`validate_message`] takes the JSON form of a message by value and
//! returns the wire form: leaf rules run on the idiomatic names first, then
//! each level is renamed through its [`KeyTable`](crate::key_map::KeyTable).
//! Failures name the dotted path of the offending field.
//!
//! The legacy `/fcm/send` payload and options have their own rules in
//! [`legacy`].

mod android;
mod apns;
mod common;
pub mod legacy;
mod webpush;

use serde_json::{Map, Value};

use crate::constants::TOPIC_PREFIX;
use crate::errors::{ErrorKind, MessagingError, Result};
use crate::key_map::KeyTable;

pub use android::{ANDROID_CONFIG_KEYS, ANDROID_NOTIFICATION_KEYS, LIGHT_SETTINGS_KEYS};
pub use apns::{APNS_FCM_OPTIONS_KEYS, APS_ALERT_KEYS, APS_KEYS};
pub use common::{format_duration_millis, is_topic_name, is_url};

use common::{is_non_empty_string, object_field, rename, validate_optional_string, validate_optional_url, validate_string_map};

/// `notification` renames.
pub const NOTIFICATION_KEYS: KeyTable = &[("imageUrl", "image")];

/// Validate one message and return its wire form.
pub fn validate_message(mut message: Value) -> Result<Value> {
    let Some(obj) = message.as_object_mut() else {
        return Err(MessagingError::new(
            ErrorKind::InvalidPayload,
            "Message must be a non-null object",
        ));
    };

    normalize_topic(obj)?;
    let targets = ["token", "topic", "condition"]
        .iter()
        .filter(|key| is_non_empty_string(obj.get(**key)))
        .count();
    if targets != 1 {
        return Err(MessagingError::new(
            ErrorKind::InvalidPayload,
            "Exactly one of topic, token or condition is required",
        ));
    }

    validate_string_map(obj, "data", "data")?;
    android::validate_android_config(obj)?;
    webpush::validate_webpush_config(obj)?;
    apns::validate_apns_config(obj)?;
    validate_fcm_options(obj)?;
    validate_notification(obj)?;
    Ok(message)
}

/// Strip the `/topics/` prefix and check the remaining name.
fn normalize_topic(obj: &mut Map<String, Value>) -> Result<()> {
    let Some(Value::String(topic)) = obj.get_mut("topic") else {
        return Ok(());
    };
    if topic.is_empty() {
        return Ok(());
    }
    if let Some(name) = topic.strip_prefix(TOPIC_PREFIX) {
        *topic = name.to_string();
    }
    if !is_topic_name(topic) {
        return Err(MessagingError::invalid_payload("topic", "Malformed topic name"));
    }
    Ok(())
}

fn validate_fcm_options(obj: &mut Map<String, Value>) -> Result<()> {
    let Some(options) = object_field(obj, "fcmOptions", "fcmOptions")? else {
        return Ok(());
    };
    validate_optional_string(options, "analyticsLabel", "fcmOptions.analyticsLabel")
}

fn validate_notification(obj: &mut Map<String, Value>) -> Result<()> {
    let Some(notification) = object_field(obj, "notification", "notification")? else {
        return Ok(());
    };
    validate_optional_url(notification, "imageUrl", "notification.imageUrl")?;
    rename(notification, NOTIFICATION_KEYS, "notification")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AndroidConfig, AndroidNotification, LightSettings, Message, Notification};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn payload_field(message: Value) -> Option<String> {
        let err = validate_message(message).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        err.field().map(String::from)
    }

    #[test]
    fn exactly_one_target_required() {
        assert!(validate_message(json!({"token": "T"})).is_ok());
        assert!(validate_message(json!({"topic": "news"})).is_ok());
        assert!(validate_message(json!({"condition": "'a' in topics"})).is_ok());

        for bad in [
            json!({}),
            json!({"token": ""}),
            json!({"token": "T", "topic": "news"}),
            json!({"token": "T", "condition": "c"}),
            json!({"token": "T", "topic": "news", "condition": "c"}),
        ] {
            let err = validate_message(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        }
    }

    #[test]
    fn non_object_rejected() {
        assert_matches!(
            validate_message(json!("hello")),
            Err(e) if e.kind() == ErrorKind::InvalidPayload
        );
        assert!(validate_message(Value::Null).is_err());
    }

    #[test]
    fn topic_prefix_is_stripped() {
        let out = validate_message(json!({"topic": "/topics/foo"})).unwrap();
        assert_eq!(out["topic"], "foo");
    }

    #[test]
    fn malformed_topic_rejected() {
        assert_eq!(payload_field(json!({"topic": "/topics/foo bar"})).as_deref(), Some("topic"));
        assert_eq!(payload_field(json!({"topic": "/topics/"})).as_deref(), Some("topic"));
        assert_eq!(payload_field(json!({"topic": "a/b"})).as_deref(), Some("topic"));
    }

    #[test]
    fn data_values_must_be_strings() {
        assert_eq!(
            payload_field(json!({"token": "T", "data": {"k": 1}})).as_deref(),
            Some("data.k")
        );
        assert_eq!(
            payload_field(json!({"token": "T", "data": {"a": "x", "nested": {"b": "c"}}})).as_deref(),
            Some("data.nested")
        );
    }

    #[test]
    fn notification_image_renamed() {
        let out = validate_message(json!({
            "token": "T",
            "notification": {"title": "Hi", "imageUrl": "https://example.com/x.png"}
        }))
        .unwrap();
        assert_eq!(
            out["notification"],
            json!({"title": "Hi", "image": "https://example.com/x.png"})
        );
        assert_eq!(
            payload_field(json!({"token": "T", "notification": {"imageUrl": "x"}})).as_deref(),
            Some("notification.imageUrl")
        );
    }

    #[test]
    fn platform_blocks_must_be_objects() {
        for (key, field) in [
            ("android", "android"),
            ("webpush", "webpush"),
            ("apns", "apns"),
            ("notification", "notification"),
            ("fcmOptions", "fcmOptions"),
        ] {
            let mut message = json!({"token": "T"});
            message[key] = json!(true);
            assert_eq!(payload_field(message).as_deref(), Some(field));
        }
    }

    #[test]
    fn analytics_label_must_be_string() {
        assert_eq!(
            payload_field(json!({"token": "T", "fcmOptions": {"analyticsLabel": 1}})).as_deref(),
            Some("fcmOptions.analyticsLabel")
        );
    }

    #[test]
    fn typed_message_goes_through_same_rules() {
        let message = Message {
            android: Some(AndroidConfig {
                ttl: Some(1500),
                notification: Some(AndroidNotification {
                    light_settings: Some(LightSettings {
                        color: "#112233".into(),
                        light_on_duration_millis: 1000,
                        light_off_duration_millis: 500,
                    }),
                    ..AndroidNotification::default()
                }),
                ..AndroidConfig::default()
            }),
            ..Message::to_token("T").with_notification(Notification::titled("Hi"))
        };
        let out = validate_message(serde_json::to_value(&message).unwrap()).unwrap();
        assert_eq!(out["android"]["ttl"], "1.500000000s");
        let ls = &out["android"]["notification"]["light_settings"];
        assert_eq!(ls["light_on_duration"], "1s");
        assert!((ls["color"]["alpha"].as_f64().unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validating_wire_form_again_is_stable() {
        let wire = validate_message(json!({
            "topic": "/topics/news",
            "notification": {"imageUrl": "https://example.com/a.png"},
            "android": {"collapseKey": "c", "notification": {"clickAction": "OPEN"}},
            "apns": {"payload": {"aps": {"threadId": "t", "contentAvailable": true}}}
        }))
        .unwrap();
        let again = validate_message(wire.clone()).unwrap();
        assert_eq!(again, wire);
    }
}
