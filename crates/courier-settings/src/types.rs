//! Settings schema. All fields have compiled defaults.

use courier_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourierSettings {
    /// Backend endpoints and dispatch behaviour.
    pub messaging: MessagingSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Backend endpoints and dispatch behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagingSettings {
    /// Base URL of the send endpoints.
    pub send_base_url: String,
    /// Base URL of the topic management endpoints.
    pub topic_management_base_url: String,
    /// URL of the multipart batch endpoint.
    pub batch_url: String,
    /// Per-request deadline.
    pub timeout_ms: u64,
    /// Deadline for a whole batch call.
    pub batch_timeout_ms: u64,
    /// Fan out on the shared client instead of a per-call session.
    pub legacy_http_transport: bool,
    /// Explicit project id, taking precedence over the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            send_base_url: "https://fcm.googleapis.com".into(),
            topic_management_base_url: "https://iid.googleapis.com".into(),
            batch_url: "https://fcm.googleapis.com/batch".into(),
            timeout_ms: 15_000,
            batch_timeout_ms: 10_000,
            legacy_http_transport: false,
            project_id: None,
        }
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Compact,
        }
    }
}
