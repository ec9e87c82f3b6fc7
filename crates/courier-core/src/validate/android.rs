use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use super::common::{
    format_duration_millis, non_negative_millis, object_field, rename, require_loc_key,
    validate_optional_string, validate_optional_url, validate_string_map,
};
use crate::errors::{MessagingError, Result};
use crate::key_map::KeyTable;

static RGB_COLOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());
static RGBA_COLOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{8}$").unwrap());

/// `android` block renames.
pub const ANDROID_CONFIG_KEYS: KeyTable = &[
    ("collapseKey", "collapse_key"),
    ("restrictedPackageName", "restricted_package_name"),
];

/// `android.notification` renames.
pub const ANDROID_NOTIFICATION_KEYS: KeyTable = &[
    ("clickAction", "click_action"),
    ("bodyLocKey", "body_loc_key"),
    ("bodyLocArgs", "body_loc_args"),
    ("titleLocKey", "title_loc_key"),
    ("titleLocArgs", "title_loc_args"),
    ("channelId", "channel_id"),
    ("imageUrl", "image"),
    ("eventTimestamp", "event_time"),
    ("localOnly", "local_only"),
    ("priority", "notification_priority"),
    ("vibrateTimingsMillis", "vibrate_timings"),
    ("defaultVibrateTimings", "default_vibrate_timings"),
    ("defaultSound", "default_sound"),
    ("lightSettings", "light_settings"),
    ("defaultLightSettings", "default_light_settings"),
    ("notificationCount", "notification_count"),
];

/// `android.notification.lightSettings` renames.
pub const LIGHT_SETTINGS_KEYS: KeyTable = &[
    ("lightOnDurationMillis", "light_on_duration"),
    ("lightOffDurationMillis", "light_off_duration"),
];

pub(super) fn validate_android_config(message: &mut Map<String, Value>) -> Result<()> {
    let Some(config) = object_field(message, "android", "android")? else {
        return Ok(());
    };

    if let Some(ttl) = config.get("ttl") {
        let millis = non_negative_millis(ttl).ok_or_else(|| {
            MessagingError::invalid_payload(
                "android.ttl",
                "TTL must be a non-negative duration in milliseconds",
            )
        })?;
        let _ = config.insert("ttl".into(), Value::String(format_duration_millis(millis)));
    }

    validate_string_map(config, "data", "android.data")?;
    validate_android_notification(config)?;
    validate_android_fcm_options(config)?;
    rename(config, ANDROID_CONFIG_KEYS, "android")
}

fn validate_android_notification(config: &mut Map<String, Value>) -> Result<()> {
    const LABEL: &str = "android.notification";
    let Some(notification) = object_field(config, "notification", LABEL)? else {
        return Ok(());
    };

    if let Some(color) = notification.get("color") {
        if !color.as_str().is_some_and(|c| RGB_COLOR.is_match(c)) {
            return Err(MessagingError::invalid_payload(
                "android.notification.color",
                "android.notification.color must be in the form #RRGGBB",
            ));
        }
    }
    require_loc_key(notification, "bodyLocArgs", "bodyLocKey", LABEL)?;
    require_loc_key(notification, "titleLocArgs", "titleLocKey", LABEL)?;
    validate_optional_url(notification, "imageUrl", "android.notification.imageUrl")?;

    if let Some(ts) = notification.get("eventTimestamp") {
        let parsed = ts
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .ok_or_else(|| {
                MessagingError::invalid_payload(
                    "android.notification.eventTimestamp",
                    "android.notification.eventTimestamp must be a valid RFC 3339 timestamp",
                )
            })?;
        let zulu = parsed.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let _ = notification.insert("eventTimestamp".into(), Value::String(zulu));
    }

    if let Some(timings) = notification.get("vibrateTimingsMillis") {
        let timings = timings.as_array().filter(|a| !a.is_empty()).ok_or_else(|| {
            MessagingError::invalid_payload(
                "android.notification.vibrateTimingsMillis",
                "android.notification.vibrateTimingsMillis must be a non-empty array of numbers",
            )
        })?;
        let rendered = timings
            .iter()
            .map(|t| {
                non_negative_millis(t)
                    .map(|ms| Value::String(format_duration_millis(ms)))
                    .ok_or_else(|| {
                        MessagingError::invalid_payload(
                            "android.notification.vibrateTimingsMillis",
                            "android.notification.vibrateTimingsMillis must be non-negative \
                             durations in milliseconds",
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let _ = notification.insert("vibrateTimingsMillis".into(), Value::Array(rendered));
    }

    upper_case_enum(notification, "priority", "PRIORITY_")?;
    upper_case_enum(notification, "visibility", "")?;
    validate_light_settings(notification)?;
    rename(notification, ANDROID_NOTIFICATION_KEYS, LABEL)
}

/// `low` → `PRIORITY_LOW`, `private` → `PRIVATE`.
fn upper_case_enum(obj: &mut Map<String, Value>, key: &str, prefix: &str) -> Result<()> {
    let Some(value) = obj.get(key) else {
        return Ok(());
    };
    let Some(name) = value.as_str() else {
        let field = format!("android.notification.{key}");
        return Err(MessagingError::invalid_payload(
            &field,
            format!("{field} must be a string value"),
        ));
    };
    let upper = format!("{prefix}{}", name.to_uppercase());
    let _ = obj.insert(key.to_string(), Value::String(upper));
    Ok(())
}

fn validate_light_settings(notification: &mut Map<String, Value>) -> Result<()> {
    const LABEL: &str = "android.notification.lightSettings";
    let Some(settings) = object_field(notification, "lightSettings", LABEL)? else {
        return Ok(());
    };

    for key in ["lightOnDurationMillis", "lightOffDurationMillis"] {
        let millis = settings.get(key).and_then(non_negative_millis).ok_or_else(|| {
            let field = format!("{LABEL}.{key}");
            MessagingError::invalid_payload(
                &field,
                format!("{field} must be a non-negative duration in milliseconds"),
            )
        })?;
        let _ = settings.insert(key.to_string(), Value::String(format_duration_millis(millis)));
    }

    let color = settings
        .get("color")
        .and_then(Value::as_str)
        .and_then(parse_rgba)
        .ok_or_else(|| {
            MessagingError::invalid_payload(
                "android.notification.lightSettings.color",
                "android.notification.lightSettings.color must be in the form #RRGGBB or \
                 #RRGGBBAA format",
            )
        })?;
    let _ = settings.insert("color".into(), color);
    rename(settings, LIGHT_SETTINGS_KEYS, LABEL)
}

/// `#RRGGBB` or `#RRGGBBAA` → `{red, green, blue, alpha}` in `[0, 1]`.
fn parse_rgba(color: &str) -> Option<Value> {
    if !RGB_COLOR.is_match(color) && !RGBA_COLOR.is_match(color) {
        return None;
    }
    let hex = &color[1..];
    let channel = |i: usize| -> Option<f64> {
        let digits = hex.get(i * 2..i * 2 + 2).unwrap_or("FF");
        u8::from_str_radix(digits, 16).ok().map(|c| f64::from(c) / 255.0)
    };
    Some(serde_json::json!({
        "red": channel(0)?,
        "green": channel(1)?,
        "blue": channel(2)?,
        "alpha": channel(3)?,
    }))
}

fn validate_android_fcm_options(config: &mut Map<String, Value>) -> Result<()> {
    let Some(options) = object_field(config, "fcmOptions", "android.fcmOptions")? else {
        return Ok(());
    };
    validate_optional_string(options, "analyticsLabel", "android.fcmOptions.analyticsLabel")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
