use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StringMap;

/// Web push message options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushConfig {
    /// Web push protocol headers (`TTL`, `Urgency`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<StringMap>,
    /// Web-only data payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StringMap>,
    /// Web notification options, passed through to the browser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<WebpushNotification>,
    /// Web push delivery options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<WebpushFcmOptions>,
}

/// Browser notification options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushNotification {
    /// Title text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Badge image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// BCP 47 language tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Replaces an existing notification with the same tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Text direction: `auto`, `ltr` or `rtl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Alert again when replacing a tagged notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renotify: Option<bool>,
    /// Stay visible until dismissed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    /// Suppress sound and vibration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    /// Milliseconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Vibration pattern in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrate: Option<Vec<u64>>,
    /// Action buttons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<WebpushNotificationAction>>,
    /// Arbitrary data attached to the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Any other notification option.
    #[serde(flatten)]
    pub custom_data: Map<String, Value>,
}

/// One action button of a browser notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebpushNotificationAction {
    /// Action identifier.
    pub action: String,
    /// Button label.
    pub title: String,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Web push delivery options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushFcmOptions {
    /// Page opened when the user clicks the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}
