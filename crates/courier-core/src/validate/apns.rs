use serde_json::{Map, Value};

use super::common::{
    coerce_flag, is_non_empty_string, object_field, rename, require_loc_key,
    validate_optional_string, validate_optional_url, validate_string_map,
};
use crate::errors::{MessagingError, Result};
use crate::key_map::KeyTable;

/// `apns.payload.aps` renames.
pub const APS_KEYS: KeyTable = &[
    ("contentAvailable", "content-available"),
    ("mutableContent", "mutable-content"),
    ("threadId", "thread-id"),
];

/// `apns.payload.aps.alert` renames.
pub const APS_ALERT_KEYS: KeyTable = &[
    ("locKey", "loc-key"),
    ("locArgs", "loc-args"),
    ("titleLocKey", "title-loc-key"),
    ("titleLocArgs", "title-loc-args"),
    ("subtitleLocKey", "subtitle-loc-key"),
    ("subtitleLocArgs", "subtitle-loc-args"),
    ("actionLocKey", "action-loc-key"),
    ("launchImage", "launch-image"),
];

/// `apns.fcmOptions` renames.
pub const APNS_FCM_OPTIONS_KEYS: KeyTable = &[("imageUrl", "image")];

pub(super) fn validate_apns_config(message: &mut Map<String, Value>) -> Result<()> {
    let Some(config) = object_field(message, "apns", "apns")? else {
        return Ok(());
    };
    validate_string_map(config, "headers", "apns.headers")?;
    validate_apns_payload(config)?;
    validate_apns_fcm_options(config)
}

fn validate_apns_payload(config: &mut Map<String, Value>) -> Result<()> {
    let Some(payload) = object_field(config, "payload", "apns.payload")? else {
        return Ok(());
    };
    validate_aps(payload)
}

fn validate_aps(payload: &mut Map<String, Value>) -> Result<()> {
    const LABEL: &str = "apns.payload.aps";
    let Some(aps) = object_field(payload, "aps", LABEL)? else {
        return Ok(());
    };
    validate_aps_alert(aps)?;
    validate_aps_sound(aps)?;
    rename(aps, APS_KEYS, LABEL)?;
    coerce_flag(aps, "content-available");
    coerce_flag(aps, "mutable-content");
    Ok(())
}

fn validate_aps_alert(aps: &mut Map<String, Value>) -> Result<()> {
    const LABEL: &str = "apns.payload.aps.alert";
    let alert = match aps.get_mut("alert") {
        None | Some(Value::String(_)) => return Ok(()),
        Some(Value::Object(alert)) => alert,
        Some(_) => {
            return Err(MessagingError::invalid_payload(
                LABEL,
                "apns.payload.aps.alert must be a string or a non-null object",
            ));
        }
    };
    require_loc_key(alert, "locArgs", "locKey", LABEL)?;
    require_loc_key(alert, "titleLocArgs", "titleLocKey", LABEL)?;
    require_loc_key(alert, "subtitleLocArgs", "subtitleLocKey", LABEL)?;
    rename(alert, APS_ALERT_KEYS, LABEL)
}

fn validate_aps_sound(aps: &mut Map<String, Value>) -> Result<()> {
    const LABEL: &str = "apns.payload.aps.sound";
    let sound = match aps.get_mut("sound") {
        None => return Ok(()),
        Some(Value::String(name)) if !name.is_empty() => return Ok(()),
        Some(Value::Object(sound)) => sound,
        Some(_) => {
            return Err(MessagingError::invalid_payload(
                LABEL,
                "apns.payload.aps.sound must be a non-empty string or a non-null object",
            ));
        }
    };
    if !is_non_empty_string(sound.get("name")) {
        return Err(MessagingError::invalid_payload(
            "apns.payload.aps.sound.name",
            "apns.payload.aps.sound.name must be a non-empty string",
        ));
    }
    if let Some(volume) = sound.get("volume") {
        let volume = volume.as_f64().ok_or_else(|| {
            MessagingError::invalid_payload(
                "apns.payload.aps.sound.volume",
                "apns.payload.aps.sound.volume must be a number",
            )
        })?;
        if !(0.0..=1.0).contains(&volume) {
            return Err(MessagingError::invalid_payload(
                "apns.payload.aps.sound.volume",
                "apns.payload.aps.sound.volume must be in the interval [0, 1]",
            ));
        }
    }
    coerce_flag(sound, "critical");
    Ok(())
}

fn validate_apns_fcm_options(config: &mut Map<String, Value>) -> Result<()> {
    const LABEL: &str = "apns.fcmOptions";
    let Some(options) = object_field(config, "fcmOptions", LABEL)? else {
        return Ok(());
    };
    validate_optional_url(options, "imageUrl", "apns.fcmOptions.imageUrl")?;
    validate_optional_string(options, "analyticsLabel", "apns.fcmOptions.analyticsLabel")?;
    rename(options, APNS_FCM_OPTIONS_KEYS, LABEL)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
