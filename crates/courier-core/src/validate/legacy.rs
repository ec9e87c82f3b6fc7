//! Rules for the legacy `/fcm/send` payload, options and recipients.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::common::rename;
use crate::constants::{MAX_TOPIC_MANAGEMENT_TOKENS, TOPIC_PREFIX};
use crate::errors::{ErrorKind, MessagingError, Result};
use crate::key_map::{KeyTable, rename_keys};

static LEGACY_TOPIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/topics/)?(private/)?[a-zA-Z0-9\-_.~%]+$").unwrap());

/// Legacy notification payload renames.
pub const LEGACY_NOTIFICATION_KEYS: KeyTable = &[
    ("bodyLocArgs", "body_loc_args"),
    ("bodyLocKey", "body_loc_key"),
    ("clickAction", "click_action"),
    ("titleLocArgs", "title_loc_args"),
    ("titleLocKey", "title_loc_key"),
];

/// Legacy options renames.
pub const LEGACY_OPTIONS_KEYS: KeyTable = &[
    ("dryRun", "dry_run"),
    ("timeToLive", "time_to_live"),
    ("collapseKey", "collapse_key"),
    ("mutableContent", "mutable_content"),
    ("contentAvailable", "content_available"),
    ("restrictedPackageName", "restricted_package_name"),
];

/// Data keys the backend reserves.
pub const RESERVED_DATA_KEYS: &[&str] = &["from"];

/// Option keys that would clobber the request body.
pub const RESERVED_OPTION_KEYS: &[&str] = &[
    "condition",
    "data",
    "notification",
    "registrationIds",
    "registration_ids",
    "to",
];

/// Validate a legacy payload and return its wire form.
pub fn validate_messaging_payload(mut payload: Value) -> Result<Value> {
    let Some(obj) = payload.as_object_mut() else {
        return Err(MessagingError::new(
            ErrorKind::InvalidPayload,
            "Messaging payload must be an object with at least one of the \"data\" or \
             \"notification\" properties.",
        ));
    };
    if let Some(key) = obj.keys().find(|k| *k != "data" && *k != "notification") {
        return Err(MessagingError::invalid_payload(
            key.as_str(),
            format!(
                "Messaging payload contains an invalid \"{key}\" property. Valid properties \
                 are \"data\" and \"notification\"."
            ),
        ));
    }
    if obj.is_empty() {
        return Err(MessagingError::new(
            ErrorKind::InvalidPayload,
            "Messaging payload must contain at least one of the \"data\" or \"notification\" \
             properties.",
        ));
    }

    for block in ["data", "notification"] {
        let Some(value) = obj.get(block) else {
            continue;
        };
        let Value::Object(entries) = value else {
            return Err(MessagingError::invalid_payload(
                block,
                format!(
                    "Messaging payload contains an invalid value for the \"{block}\" property. \
                     Value must be an object."
                ),
            ));
        };
        for (key, v) in entries {
            let field = format!("{block}.{key}");
            if !v.is_string() {
                return Err(MessagingError::invalid_payload(
                    &field,
                    format!(
                        "Messaging payload contains an invalid value for the \"{field}\" \
                         property. Values must be strings."
                    ),
                ));
            }
            if block == "data" && (key.starts_with("google.") || RESERVED_DATA_KEYS.contains(&key.as_str())) {
                return Err(MessagingError::invalid_payload(
                    &field,
                    format!("Messaging payload contains the blacklisted \"{field}\" property."),
                ));
            }
        }
    }

    if let Some(Value::Object(notification)) = obj.get_mut("notification") {
        rename(notification, LEGACY_NOTIFICATION_KEYS, "notification")?;
    }
    Ok(payload)
}

fn non_empty_str(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

/// Type rule per wire option name: `(name, check, expected)`.
const OPTION_CHECKS: &[(&str, fn(&Value) -> bool, &str)] = &[
    ("collapse_key", non_empty_str, "a non-empty string"),
    ("dry_run", Value::is_boolean, "a boolean"),
    ("priority", non_empty_str, "a non-empty string"),
    ("restricted_package_name", non_empty_str, "a non-empty string"),
    ("time_to_live", Value::is_number, "a number"),
    ("content_available", Value::is_boolean, "a boolean"),
    ("mutable_content", Value::is_boolean, "a boolean"),
];

/// Validate legacy options and return their wire form.
///
/// Type errors name the key as the caller spelled it.
pub fn validate_messaging_options(mut options: Value) -> Result<Value> {
    let Some(obj) = options.as_object_mut() else {
        return Err(MessagingError::invalid_options("Messaging options must be an object."));
    };
    if let Some(key) = RESERVED_OPTION_KEYS.iter().find(|k| obj.contains_key(**k)) {
        return Err(MessagingError::invalid_options(format!(
            "Messaging options contains the blacklisted \"{key}\" property."
        ))
        .with_field(*key));
    }

    let original_keys: Vec<String> = obj.keys().cloned().collect();
    rename_keys(obj, LEGACY_OPTIONS_KEYS).map_err(|conflict| {
        MessagingError::invalid_options(format!(
            "Messaging options contains both \"{}\" and \"{}\".",
            conflict.from, conflict.to
        ))
        .with_field(conflict.from)
    })?;

    let caller_name = |wire: &str| -> String {
        LEGACY_OPTIONS_KEYS
            .iter()
            .find(|(_, to)| *to == wire)
            .map(|(from, _)| *from)
            .filter(|from| original_keys.iter().any(|k| k == from))
            .unwrap_or(wire)
            .to_string()
    };
    let invalid = |wire: &str, expected: &str| {
        let key = caller_name(wire);
        MessagingError::invalid_options(format!(
            "Messaging options contains an invalid value for the \"{key}\" property. Value \
             must be {expected}."
        ))
        .with_field(key)
    };

    for &(wire, ok, expected) in OPTION_CHECKS {
        if let Some(v) = obj.get(wire) {
            if !ok(v) {
                return Err(invalid(wire, expected));
            }
        }
    }
    Ok(options)
}

/// Check a registration token list for `sendToDevice` and topic management.
///
/// Violations are reported with `kind` so each caller keeps its own error
/// vocabulary.
pub fn validate_registration_tokens(tokens: &[&str], method: &str, kind: ErrorKind) -> Result<()> {
    if tokens.is_empty() {
        return Err(MessagingError::new(
            kind,
            format!(
                "Registration token(s) provided to {method}() must be a non-empty string or a \
                 non-empty array."
            ),
        ));
    }
    if tokens.len() > MAX_TOPIC_MANAGEMENT_TOKENS {
        return Err(MessagingError::new(
            kind,
            format!(
                "Too many registration tokens provided in a single request to {method}(). Batch \
                 your requests to contain no more than {MAX_TOPIC_MANAGEMENT_TOKENS} registration \
                 tokens per request."
            ),
        ));
    }
    if let Some(index) = tokens.iter().position(|t| t.is_empty()) {
        return Err(MessagingError::new(
            kind,
            format!("Registration token provided to {method}() at index {index} must be a non-empty string."),
        ));
    }
    Ok(())
}

/// Prefix `topic` with `/topics/` and check the legacy topic grammar.
pub fn normalize_legacy_topic(topic: &str, method: &str, kind: ErrorKind) -> Result<String> {
    let invalid = || {
        MessagingError::new(
            kind,
            format!(
                "Topic provided to {method}() must be a string which matches the format \
                 \"/topics/[a-zA-Z0-9-_.~%]+\"."
            ),
        )
    };
    if topic.is_empty() {
        return Err(invalid());
    }
    let normalized = if topic.starts_with(TOPIC_PREFIX) {
        topic.to_string()
    } else {
        format!("{TOPIC_PREFIX}{topic}")
    };
    if !LEGACY_TOPIC.is_match(&normalized) {
        return Err(invalid());
    }
    Ok(normalized)
}

/// Deep-merge `overlay` into `base`: objects merge, anything else replaces.
pub fn deep_extend(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        let Value::Object(incoming) = value else {
            let _ = base.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = base.get_mut(&key) {
            deep_extend(existing, incoming);
            continue;
        }
        let _ = base.insert(key, Value::Object(incoming));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_requires_data_or_notification() {
        let err = validate_messaging_payload(json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);

        let err = validate_messaging_payload(json!({"data": {}, "extra": {}})).unwrap_err();
        assert_eq!(err.field(), Some("extra"));

        assert!(validate_messaging_payload(json!("x")).is_err());
    }

    #[test]
    fn payload_values_must_be_strings() {
        let err = validate_messaging_payload(json!({"notification": {"badge": 1}})).unwrap_err();
        assert_eq!(err.field(), Some("notification.badge"));

        let err = validate_messaging_payload(json!({"data": []})).unwrap_err();
        assert_eq!(err.field(), Some("data"));
    }

    #[test]
    fn reserved_data_keys_rejected() {
        let err = validate_messaging_payload(json!({"data": {"google.x": "1"}})).unwrap_err();
        assert_eq!(err.field(), Some("data.google.x"));
        let err = validate_messaging_payload(json!({"data": {"from": "me"}})).unwrap_err();
        assert_eq!(err.field(), Some("data.from"));
    }

    #[test]
    fn notification_keys_renamed() {
        let out = validate_messaging_payload(json!({
            "notification": {"clickAction": "OPEN", "bodyLocArgs": "[\"a\"]", "title": "t"}
        }))
        .unwrap();
        assert_eq!(
            out["notification"],
            json!({"click_action": "OPEN", "body_loc_args": "[\"a\"]", "title": "t"})
        );
    }

    #[test]
    fn options_renamed_and_checked() {
        let out = validate_messaging_options(json!({"dryRun": true, "timeToLive": 60})).unwrap();
        assert_eq!(out, json!({"dry_run": true, "time_to_live": 60}));

        let err = validate_messaging_options(json!({"dryRun": "yes"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOptions);
        assert_eq!(err.field(), Some("dryRun"));

        let err = validate_messaging_options(json!({"time_to_live": "1h"})).unwrap_err();
        assert_eq!(err.field(), Some("time_to_live"));

        let err = validate_messaging_options(json!({"priority": ""})).unwrap_err();
        assert_eq!(err.field(), Some("priority"));
    }

    #[test]
    fn reserved_options_rejected() {
        for key in RESERVED_OPTION_KEYS {
            let mut options = json!({});
            options[*key] = json!("x");
            let err = validate_messaging_options(options).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidOptions);
        }
        assert!(validate_messaging_options(json!(3)).is_err());
    }

    #[test]
    fn token_lists() {
        assert!(validate_registration_tokens(&["a", "b"], "sendToDevice", ErrorKind::InvalidRecipient).is_ok());
        let err = validate_registration_tokens(&[], "sendToDevice", ErrorKind::InvalidRecipient).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecipient);
        let err = validate_registration_tokens(&["a", ""], "subscribeToTopic", ErrorKind::InvalidArgument)
            .unwrap_err();
        assert!(err.message().contains("index 1"));
        let many = vec!["t"; MAX_TOPIC_MANAGEMENT_TOKENS + 1];
        assert!(validate_registration_tokens(&many, "x", ErrorKind::InvalidArgument).is_err());
    }

    #[test]
    fn legacy_topics() {
        assert_eq!(
            normalize_legacy_topic("news", "sendToTopic", ErrorKind::InvalidRecipient).unwrap(),
            "/topics/news"
        );
        assert_eq!(
            normalize_legacy_topic("/topics/private/x", "sendToTopic", ErrorKind::InvalidRecipient)
                .unwrap(),
            "/topics/private/x"
        );
        assert!(normalize_legacy_topic("a b", "sendToTopic", ErrorKind::InvalidRecipient).is_err());
        assert!(normalize_legacy_topic("", "sendToTopic", ErrorKind::InvalidRecipient).is_err());
    }

    #[test]
    fn deep_extend_merges_objects() {
        let mut base = match json!({"data": {"a": "1"}, "to": "x"}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let overlay = match json!({"data": {"b": "2"}, "dry_run": true}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        deep_extend(&mut base, overlay);
        assert_eq!(
            Value::Object(base),
            json!({"data": {"a": "1", "b": "2"}, "to": "x", "dry_run": true})
        );
    }
}
