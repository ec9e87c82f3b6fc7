//! Payload and options of the legacy send API (`/fcm/send`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StringMap;

/// Legacy payload: a data block, a notification block, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingPayload {
    /// Application data. Keys may not start with `google.` nor be `from`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StringMap>,
    /// Display notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationMessagePayload>,
}

/// Legacy notification block. Every value is a string on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessagePayload {
    /// Title text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Icon resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Badge value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Icon colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Sound resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Replaces an existing notification with the same tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Action fired on click.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
    /// Localization key of the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_loc_key: Option<String>,
    /// JSON array of body format arguments, as a string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_loc_args: Option<String>,
    /// Localization key of the title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_key: Option<String>,
    /// JSON array of title format arguments, as a string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_args: Option<String>,
    /// Any other notification key.
    #[serde(flatten)]
    pub extra: StringMap,
}

/// Legacy send options, merged into the request body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingOptions {
    /// Validate without delivering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    /// `high` or `normal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Time to live in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u64>,
    /// Collapse key for grouping messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    /// Lets an iOS notification service extension modify the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<bool>,
    /// Wake an inactive iOS app.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,
    /// Package name the registration tokens must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
    /// Any other option, passed through as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One registration token or a list of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistrationTokens {
    /// A single token, sent as `to`.
    One(String),
    /// Several tokens, sent as `registration_ids`.
    Many(Vec<String>),
}

impl RegistrationTokens {
    /// Tokens as a slice-like list.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::One(token) => vec![token.as_str()],
            Self::Many(tokens) => tokens.iter().map(String::as_str).collect(),
        }
    }

    /// Owned list of tokens.
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::One(token) => vec![token],
            Self::Many(tokens) => tokens,
        }
    }
}

impl From<String> for RegistrationTokens {
    fn from(token: String) -> Self {
        Self::One(token)
    }
}

impl From<&str> for RegistrationTokens {
    fn from(token: &str) -> Self {
        Self::One(token.to_string())
    }
}

impl From<Vec<String>> for RegistrationTokens {
    fn from(tokens: Vec<String>) -> Self {
        Self::Many(tokens)
    }
}

impl From<Vec<&str>> for RegistrationTokens {
    fn from(tokens: Vec<&str>) -> Self {
        Self::Many(tokens.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RegistrationTokens {
    fn from(tokens: [&str; N]) -> Self {
        Self::Many(tokens.iter().map(|t| (*t).to_string()).collect())
    }
}
