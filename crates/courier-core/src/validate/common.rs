//! Leaf rules shared by every block of the message schema.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::{MessagingError, Result};
use crate::key_map::{KeyConflict, rename_keys};

static TOPIC_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_.~%]+$").unwrap());

static URL_ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[^a-z0-9:/?#\[\]@!$&'()*+,;=.\-_~%]").unwrap());

static URL_PARTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:https?)://([^/?#]*)([^?#]*)(\?[^#]*)?(#.*)?$").unwrap());

static URL_HOSTNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+[\w-]*([.]?[a-zA-Z0-9]+[\w-]*)*$").unwrap());

static URL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/[\w\-=.~!$'()*+,;:@%]+)*/?$").unwrap());

/// Whether `name` (without prefix) is a legal topic name.
pub fn is_topic_name(name: &str) -> bool {
    TOPIC_NAME.is_match(name)
}

/// Whether `candidate` is a well-formed `http` or `https` URL.
pub fn is_url(candidate: &str) -> bool {
    if candidate.is_empty() || URL_ILLEGAL_CHARS.is_match(candidate) {
        return false;
    }
    let Some(parts) = URL_PARTS.captures(candidate) else {
        return false;
    };
    let authority = parts.get(1).map_or("", |m| m.as_str());
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = match host_port.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        Some(_) => return false,
        None => host_port,
    };
    if !URL_HOSTNAME.is_match(host) {
        return false;
    }
    let path = parts.get(2).map_or("", |m| m.as_str());
    URL_PATH.is_match(path)
}

/// Render a millisecond duration as the backend's seconds string.
///
/// Whole seconds render as `"<s>s"`; anything else carries nine nanosecond
/// digits, e.g. `1500.0` → `"1.500000000s"`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration_millis(millis: f64) -> String {
    let seconds = (millis / 1000.0).floor();
    let nanos = ((millis - seconds * 1000.0) * 1_000_000.0).floor();
    if nanos > 0.0 {
        format!("{}.{:09}s", seconds as u64, nanos as u64)
    } else {
        format!("{}s", seconds as u64)
    }
}

/// A finite, non-negative number.
pub(crate) fn non_negative_millis(value: &Value) -> Option<f64> {
    value.as_f64().filter(|ms| ms.is_finite() && *ms >= 0.0)
}

pub(crate) fn is_non_empty_string(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).is_some_and(|s| !s.is_empty())
}

pub(crate) fn is_non_empty_array(value: Option<&Value>) -> bool {
    value.and_then(Value::as_array).is_some_and(|a| !a.is_empty())
}

/// Borrow `parent[key]` as an object, if present.
///
/// A present value that is not an object (including `null`) is an error
/// naming `label`.
pub(crate) fn object_field<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
    label: &str,
) -> Result<Option<&'a mut Map<String, Value>>> {
    match parent.get_mut(key) {
        None => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(_) => Err(MessagingError::invalid_payload(
            label,
            format!("{label} must be a non-null object"),
        )),
    }
}

/// Check that `parent[key]`, if present, maps strings to strings.
pub(crate) fn validate_string_map(
    parent: &Map<String, Value>,
    key: &str,
    label: &str,
) -> Result<()> {
    let Some(value) = parent.get(key) else {
        return Ok(());
    };
    let Value::Object(map) = value else {
        return Err(MessagingError::invalid_payload(
            label,
            format!("{label} must be a non-null object"),
        ));
    };
    if let Some((bad, _)) = map.iter().find(|(_, v)| !v.is_string()) {
        let field = format!("{label}.{bad}");
        return Err(MessagingError::invalid_payload(
            &field,
            format!("{field} must be a string value; {label} must only contain string values"),
        ));
    }
    Ok(())
}

/// Check that `obj[key]`, if present, is a string.
pub(crate) fn validate_optional_string(
    obj: &Map<String, Value>,
    key: &str,
    label: &str,
) -> Result<()> {
    match obj.get(key) {
        Some(v) if !v.is_string() => Err(MessagingError::invalid_payload(
            label,
            format!("{label} must be a string value"),
        )),
        _ => Ok(()),
    }
}

/// Check that `obj[key]`, if present, is a well-formed URL.
pub(crate) fn validate_optional_url(obj: &Map<String, Value>, key: &str, label: &str) -> Result<()> {
    match obj.get(key) {
        Some(v) if !v.as_str().is_some_and(is_url) => Err(MessagingError::invalid_payload(
            label,
            format!("{label} must be a valid URL string"),
        )),
        _ => Ok(()),
    }
}

/// `<args>` present and non-empty requires a non-empty `<key>`.
pub(crate) fn require_loc_key(
    obj: &Map<String, Value>,
    args_key: &str,
    key_key: &str,
    label: &str,
) -> Result<()> {
    if is_non_empty_array(obj.get(args_key)) && !is_non_empty_string(obj.get(key_key)) {
        return Err(MessagingError::invalid_payload(
            format!("{label}.{key_key}"),
            format!("{label}.{key_key} is required when specifying {args_key}"),
        ));
    }
    Ok(())
}

/// Backend boolean flags are the integer `1`: `true` and `1.0` become `1`,
/// anything else is dropped.
pub(crate) fn coerce_flag(obj: &mut Map<String, Value>, key: &str) {
    let set = match obj.get(key) {
        None => return,
        Some(Value::Bool(true)) => true,
        Some(v) => v.as_i64() == Some(1) || v.as_f64() == Some(1.0),
    };
    if set {
        let _ = obj.insert(key.to_string(), Value::from(1));
    } else {
        let _ = obj.remove(key);
    }
}

/// Apply a rename table, reporting ambiguity as a payload error on `label`.
pub(crate) fn rename(obj: &mut Map<String, Value>, table: &[(&str, &str)], label: &str) -> Result<()> {
    rename_keys(obj, table).map_err(|KeyConflict { from, to }| {
        MessagingError::invalid_payload(
            format!("{label}.{from}"),
            format!("Multiple specifications for {from} in {label} ({from} and {to})"),
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
