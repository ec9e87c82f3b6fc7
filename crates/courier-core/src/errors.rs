//! Error taxonomy for the courier client.
//!
//! Every failure surfaced by the client is a [`MessagingError`] carrying a
//! stable [`ErrorKind`]. Callers branch on the kind (or its machine code,
//! e.g. `messaging/invalid-payload`) rather than on message text.
//!
//! Backend error codes are translated through two tables: one for the send
//! endpoints and one for the topic management endpoints. Codes missing from
//! a table become [`ErrorKind::Unknown`] with the raw code preserved in
//! [`MessagingError::server_code`].

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// ErrorKind
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of error kinds a caller can branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed call-site input: wrong arity, wrong type, over limit.
    InvalidArgument,
    /// Malformed token, topic, condition or notification key.
    InvalidRecipient,
    /// Message schema violation.
    InvalidPayload,
    /// The data payload contains a key the backend rejects.
    InvalidDataPayloadKey,
    /// The message payload exceeds the backend size limit.
    PayloadSizeLimitExceeded,
    /// Legacy options object violation.
    InvalidOptions,
    /// The registration token is malformed.
    InvalidRegistration,
    /// The registration token is no longer registered.
    Unregistered,
    /// Token does not match the restricted package name.
    InvalidPackageName,
    /// Too many messages to a single device.
    DeviceMessageRateExceeded,
    /// Too many messages to a single topic.
    TopicsMessageRateExceeded,
    /// Sending quota exceeded for the message target.
    QuotaExceeded,
    /// The credential may not send to this target.
    MismatchedCredential,
    /// APNs or web push credential failure.
    ThirdPartyAuthError,
    /// The token is subscribed to too many topics.
    TooManyTopics,
    /// Authentication against the backend failed.
    AuthenticationError,
    /// The backend is temporarily unavailable.
    ServerUnavailable,
    /// The request could not reach the backend.
    NetworkError,
    /// The request deadline elapsed before a response arrived.
    NetworkTimeout,
    /// The client is missing required configuration (e.g. a project id).
    Configuration,
    /// Unexpected backend or internal invariant break.
    Internal,
    /// Unrecognized backend error code.
    Unknown,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "messaging/invalid-argument",
            Self::InvalidRecipient => "messaging/invalid-recipient",
            Self::InvalidPayload => "messaging/invalid-payload",
            Self::InvalidDataPayloadKey => "messaging/invalid-data-payload-key",
            Self::PayloadSizeLimitExceeded => "messaging/payload-size-limit-exceeded",
            Self::InvalidOptions => "messaging/invalid-options",
            Self::InvalidRegistration => "messaging/invalid-registration-token",
            Self::Unregistered => "messaging/registration-token-not-registered",
            Self::InvalidPackageName => "messaging/invalid-package-name",
            Self::DeviceMessageRateExceeded => "messaging/device-message-rate-exceeded",
            Self::TopicsMessageRateExceeded => "messaging/topics-message-rate-exceeded",
            Self::QuotaExceeded => "messaging/message-rate-exceeded",
            Self::MismatchedCredential => "messaging/mismatched-credential",
            Self::ThirdPartyAuthError => "messaging/third-party-auth-error",
            Self::TooManyTopics => "messaging/too-many-topics",
            Self::AuthenticationError => "messaging/authentication-error",
            Self::ServerUnavailable => "messaging/server-unavailable",
            Self::NetworkError => "messaging/network-error",
            Self::NetworkTimeout => "messaging/network-timeout",
            Self::Configuration => "messaging/invalid-configuration",
            Self::Internal => "messaging/internal-error",
            Self::Unknown => "messaging/unknown-error",
        }
    }

    /// Message used when the backend does not supply one.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::InvalidArgument => "Invalid argument provided.",
            Self::InvalidRecipient => "Invalid message recipient provided.",
            Self::InvalidPayload => "Invalid message payload provided.",
            Self::InvalidDataPayloadKey => "The data message payload contains an invalid key.",
            Self::PayloadSizeLimitExceeded => {
                "The provided message payload exceeds the backend size limit."
            }
            Self::InvalidOptions => "Invalid message options provided.",
            Self::InvalidRegistration => {
                "Invalid registration token provided. Make sure it matches the registration \
                 token the client app receives from registering with the backend."
            }
            Self::Unregistered => {
                "The provided registration token is not registered. A previously valid \
                 registration token can be unregistered for a variety of reasons."
            }
            Self::InvalidPackageName => {
                "The message was addressed to a registration token whose package name does \
                 not match the provided restrictedPackageName option."
            }
            Self::DeviceMessageRateExceeded => {
                "The rate of messages to a particular device is too high."
            }
            Self::TopicsMessageRateExceeded => {
                "The rate of messages to subscribers of a particular topic is too high."
            }
            Self::QuotaExceeded => "Sending limit exceeded for the message target.",
            Self::MismatchedCredential => {
                "The credential used to authenticate this request does not have permission \
                 to send messages to the target."
            }
            Self::ThirdPartyAuthError => {
                "A message targeted to an iOS device or a web push registration could not \
                 be sent due to a third party credential error."
            }
            Self::TooManyTopics => {
                "The maximum number of topics the registration token can be subscribed to \
                 has been exceeded."
            }
            Self::AuthenticationError => {
                "An error occurred when trying to authenticate to the backend. Make sure the \
                 credential used has the proper permissions."
            }
            Self::ServerUnavailable => "The server could not process the request in time.",
            Self::NetworkError => "A network error occurred while sending the request.",
            Self::NetworkTimeout => "The request timed out before the backend responded.",
            Self::Configuration => "The client is not configured to send messages.",
            Self::Internal => "An internal error has occurred. Please retry the request.",
            Self::Unknown => "An unknown server error was returned.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server code tables
// ─────────────────────────────────────────────────────────────────────────────

/// Backend codes returned by the send endpoints (legacy and v1).
const SEND_SERVER_CODES: &[(&str, ErrorKind)] = &[
    ("InvalidParameters", ErrorKind::InvalidArgument),
    ("MismatchSenderId", ErrorKind::MismatchedCredential),
    ("Unavailable", ErrorKind::ServerUnavailable),
    ("InternalServerError", ErrorKind::Internal),
    ("InvalidRegistration", ErrorKind::InvalidRegistration),
    ("NotRegistered", ErrorKind::Unregistered),
    ("InvalidPackageName", ErrorKind::InvalidPackageName),
    ("MessageTooBig", ErrorKind::PayloadSizeLimitExceeded),
    ("InvalidDataKey", ErrorKind::InvalidDataPayloadKey),
    ("InvalidTtl", ErrorKind::InvalidOptions),
    ("DeviceMessageRateExceeded", ErrorKind::DeviceMessageRateExceeded),
    ("TopicsMessageRateExceeded", ErrorKind::TopicsMessageRateExceeded),
    ("InvalidApnsCredential", ErrorKind::ThirdPartyAuthError),
    ("NOT_FOUND", ErrorKind::Unregistered),
    ("PERMISSION_DENIED", ErrorKind::MismatchedCredential),
    ("RESOURCE_EXHAUSTED", ErrorKind::QuotaExceeded),
    ("UNAUTHENTICATED", ErrorKind::ThirdPartyAuthError),
    ("APNS_AUTH_ERROR", ErrorKind::ThirdPartyAuthError),
    ("INTERNAL", ErrorKind::Internal),
    ("INVALID_ARGUMENT", ErrorKind::InvalidArgument),
    ("QUOTA_EXCEEDED", ErrorKind::QuotaExceeded),
    ("SENDER_ID_MISMATCH", ErrorKind::MismatchedCredential),
    ("THIRD_PARTY_AUTH_ERROR", ErrorKind::ThirdPartyAuthError),
    ("UNAVAILABLE", ErrorKind::ServerUnavailable),
    ("UNREGISTERED", ErrorKind::Unregistered),
    ("UNSPECIFIED_ERROR", ErrorKind::Unknown),
];

/// Backend codes returned by the topic management endpoints.
const TOPIC_MANAGEMENT_SERVER_CODES: &[(&str, ErrorKind)] = &[
    ("NOT_FOUND", ErrorKind::Unregistered),
    ("INVALID_ARGUMENT", ErrorKind::InvalidRegistration),
    ("TOO_MANY_TOPICS", ErrorKind::TooManyTopics),
    ("RESOURCE_EXHAUSTED", ErrorKind::TooManyTopics),
    ("PERMISSION_DENIED", ErrorKind::AuthenticationError),
    ("DEADLINE_EXCEEDED", ErrorKind::ServerUnavailable),
    ("INTERNAL", ErrorKind::Internal),
    ("UNKNOWN", ErrorKind::Unknown),
];

fn lookup(table: &[(&str, ErrorKind)], code: Option<&str>) -> ErrorKind {
    code.and_then(|c| table.iter().find(|(k, _)| *k == c).map(|(_, kind)| *kind))
        .unwrap_or(ErrorKind::Unknown)
}

// ─────────────────────────────────────────────────────────────────────────────
// MessagingError
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised by validation, dispatch or backend translation.
#[derive(Clone, Debug, Error, Serialize)]
#[error("[{kind}] {message}")]
#[serde(rename_all = "camelCase")]
pub struct MessagingError {
    #[serde(rename = "code")]
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_code: Option<String>,
    #[serde(skip)]
    raw_response: Option<Value>,
}

/// Result alias used across the client.
pub type Result<T> = std::result::Result<T, MessagingError>;

impl MessagingError {
    /// Create an error with an explicit kind and message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            server_code: None,
            raw_response: None,
        }
    }

    /// Malformed call-site input.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Schema violation at the given dotted field path.
    #[must_use]
    pub fn invalid_payload(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPayload, message).with_field(field)
    }

    /// Malformed recipient.
    #[must_use]
    pub fn invalid_recipient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRecipient, message)
    }

    /// Legacy options violation.
    #[must_use]
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOptions, message)
    }

    /// Missing client configuration.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Internal invariant break.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Translate a send-endpoint error code into a typed error.
    ///
    /// `message` overrides the kind's default message. When the code is not
    /// recognized, the raw response is appended to the message so nothing is
    /// lost for diagnostics.
    #[must_use]
    pub fn from_server_error(
        code: Option<&str>,
        message: Option<&str>,
        raw_response: Option<&Value>,
    ) -> Self {
        Self::from_table(SEND_SERVER_CODES, code, message, raw_response)
    }

    /// Translate a topic-management error code into a typed error.
    #[must_use]
    pub fn from_topic_management_server_error(
        code: Option<&str>,
        message: Option<&str>,
        raw_response: Option<&Value>,
    ) -> Self {
        Self::from_table(TOPIC_MANAGEMENT_SERVER_CODES, code, message, raw_response)
    }

    fn from_table(
        table: &[(&str, ErrorKind)],
        code: Option<&str>,
        message: Option<&str>,
        raw_response: Option<&Value>,
    ) -> Self {
        let kind = lookup(table, code);
        let mut text = message
            .filter(|m| !m.is_empty())
            .map_or_else(|| kind.default_message().to_string(), String::from);
        if kind == ErrorKind::Unknown {
            if let Some(raw) = raw_response {
                text.push_str(&format!(" Raw server response: \"{raw}\""));
            }
        }
        Self {
            kind,
            message: text,
            field: None,
            server_code: code.map(String::from),
            raw_response: raw_response.cloned(),
        }
    }

    /// Attach the dotted path of the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable machine-readable code (shorthand for `kind().code()`).
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Dotted path of the offending field, for payload errors.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Raw backend error code, when the error came from the backend.
    pub fn server_code(&self) -> Option<&str> {
        self.server_code.as_deref()
    }

    /// Raw backend response body, when available.
    pub fn raw_response(&self) -> Option<&Value> {
        self.raw_response.as_ref()
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("failed to serialize message: {err}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
