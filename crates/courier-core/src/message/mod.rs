//! Caller-facing message model.
//!
//! These types serialize with idiomatic camelCase names. The validator works
//! on their JSON form, so a [`Message`] and a hand-written JSON object go
//! through the same rules.

mod android;
mod apns;
pub mod legacy;
mod webpush;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use android::{
    AndroidConfig, AndroidFcmOptions, AndroidMessagePriority, AndroidNotification, LightSettings,
    NotificationPriority, Visibility,
};
pub use apns::{ApnsConfig, ApnsFcmOptions, ApnsPayload, Aps, ApsAlert, ApsAlertBody, ApsSound, CriticalSound};
pub use legacy::{MessagingOptions, MessagingPayload, NotificationMessagePayload, RegistrationTokens};
pub use webpush::{WebpushConfig, WebpushFcmOptions, WebpushNotification, WebpushNotificationAction};

/// String-to-string map used for `data` and header blocks.
pub type StringMap = BTreeMap<String, String>;

/// One notification unit addressed to a token, a topic or a condition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Registration token of a single device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Topic name, with or without the `/topics/` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Boolean expression over topic names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Arbitrary application payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StringMap>,
    /// Cross-platform display hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// Android-specific options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    /// Web push options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<WebpushConfig>,
    /// APNs options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
    /// Platform-independent delivery options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<FcmOptions>,
}

impl Message {
    /// Message addressed to a single registration token.
    pub fn to_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Message addressed to a topic.
    pub fn to_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    /// Message addressed to a topic condition.
    pub fn to_condition(condition: impl Into<String>) -> Self {
        Self {
            condition: Some(condition.into()),
            ..Self::default()
        }
    }

    /// Attach a notification block.
    #[must_use]
    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }

    /// Insert one data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self
            .data
            .get_or_insert_with(StringMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// One message template fanned out to many registration tokens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastMessage {
    /// Registration tokens, at most 500.
    pub tokens: Vec<String>,
    /// Arbitrary application payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StringMap>,
    /// Cross-platform display hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// Android-specific options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    /// Web push options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<WebpushConfig>,
    /// APNs options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
    /// Platform-independent delivery options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<FcmOptions>,
}

/// Basic notification shown on every platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Title text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Image to download and display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Notification {
    /// Notification with a title only.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Platform-independent delivery options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcmOptions {
    /// Label attached to the message's analytics data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
}
