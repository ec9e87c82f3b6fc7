//! Backend error translation.
//!
//! Handles the error envelopes the backend returns:
//! - Legacy:  `{"error": "NotRegistered"}`
//! - v1:      `{"error": {"status": "...", "message": "...", "details": [...]}}`
//!   where a detail of type `google.firebase.fcm.v1.FcmError` carries the
//!   more specific `errorCode`
//!
//! Non-JSON bodies are classified by HTTP status alone.

use courier_core::{ErrorKind, MessagingError};
use courier_transport::HttpResponse;
use serde_json::Value;

const FCM_ERROR_TYPE: &str = "type.googleapis.com/google.firebase.fcm.v1.FcmError";

/// Backend error code carried by `body`, if any.
///
/// Extraction order: string `error`, FCM error detail `errorCode`,
/// `error.status`, `error.message`.
pub fn error_code(body: &Value) -> Option<String> {
    let error = body.as_object()?.get("error")?;
    if let Some(code) = error.as_str() {
        return Some(code.to_string());
    }
    let detail_code = error
        .get("details")
        .and_then(Value::as_array)
        .and_then(|details| {
            details
                .iter()
                .find(|d| d.get("@type").and_then(Value::as_str) == Some(FCM_ERROR_TYPE))
        })
        .and_then(|d| d.get("errorCode"))
        .and_then(Value::as_str);
    detail_code
        .or_else(|| error.get("status").and_then(Value::as_str))
        .or_else(|| error.get("message").and_then(Value::as_str))
        .map(String::from)
}

/// Human-readable message carried by `body`, if any.
pub fn error_message(body: &Value) -> Option<String> {
    body.get("error")?
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(String::from)
}

/// Typed error for a failed response.
pub fn error_from_response(response: &HttpResponse) -> MessagingError {
    if let Some(body) = response.data() {
        let code = error_code(&body);
        let message = error_message(&body);
        return MessagingError::from_server_error(code.as_deref(), message.as_deref(), Some(&body));
    }

    let kind = match response.status {
        400 => ErrorKind::InvalidArgument,
        401 | 403 => ErrorKind::AuthenticationError,
        500 => ErrorKind::Internal,
        503 => ErrorKind::ServerUnavailable,
        _ => ErrorKind::Unknown,
    };
    MessagingError::new(
        kind,
        format!(
            "{} Raw server response: \"{}\". Status code: {}.",
            kind.default_message(),
            response.body,
            response.status
        ),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
