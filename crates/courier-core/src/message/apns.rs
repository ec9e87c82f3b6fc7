use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StringMap;

/// APNs-specific message options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApnsConfig {
    /// Raw APNs request headers (`apns-priority`, `apns-expiration`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<StringMap>,
    /// APNs payload, including the `aps` dictionary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ApnsPayload>,
    /// APNs delivery options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<ApnsFcmOptions>,
}

/// APNs payload: the `aps` dictionary plus arbitrary custom keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApnsPayload {
    /// The `aps` dictionary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aps: Option<Aps>,
    /// Custom keys sent alongside `aps`.
    #[serde(flatten)]
    pub custom_data: Map<String, Value>,
}

/// The `aps` dictionary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aps {
    /// Alert text or structured alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<ApsAlert>,
    /// App icon badge value; zero clears the badge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    /// Sound to play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<ApsSound>,
    /// Background update notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,
    /// Lets a notification service extension modify the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<bool>,
    /// Notification category identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Groups related notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Custom keys inside `aps`.
    #[serde(flatten)]
    pub custom_data: Map<String, Value>,
}

/// Alert: plain text or a structured, localizable body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApsAlert {
    /// Plain alert text.
    Text(String),
    /// Structured alert.
    Structured(ApsAlertBody),
}

/// Structured APNs alert.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApsAlertBody {
    /// Title text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Subtitle text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Localization key of the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc_key: Option<String>,
    /// Format arguments for `loc_key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc_args: Option<Vec<String>>,
    /// Localization key of the title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_key: Option<String>,
    /// Format arguments for `title_loc_key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_args: Option<Vec<String>>,
    /// Localization key of the subtitle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_loc_key: Option<String>,
    /// Format arguments for `subtitle_loc_key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_loc_args: Option<Vec<String>>,
    /// Localization key of the action button title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_loc_key: Option<String>,
    /// Launch image file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_image: Option<String>,
}

/// Sound: a file name or a critical-alert sound dictionary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApsSound {
    /// Sound file name.
    Name(String),
    /// Critical alert sound.
    Critical(CriticalSound),
}

/// Critical alert sound dictionary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriticalSound {
    /// Marks the sound as a critical alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    /// Sound file name.
    pub name: String,
    /// Volume in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// APNs delivery options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApnsFcmOptions {
    /// Label attached to the message's analytics data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
    /// Image URL shown in the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alert_and_sound_accept_both_shapes() {
        let aps: Aps = serde_json::from_value(json!({
            "alert": "hello",
            "sound": {"name": "beep", "critical": true, "volume": 0.5}
        }))
        .unwrap();
        assert_eq!(aps.alert, Some(ApsAlert::Text("hello".into())));
        assert!(matches!(aps.sound, Some(ApsSound::Critical(ref s)) if s.name == "beep"));

        let aps: Aps = serde_json::from_value(json!({
            "alert": {"locKey": "K", "locArgs": ["a"]},
            "sound": "default"
        }))
        .unwrap();
        assert!(matches!(aps.alert, Some(ApsAlert::Structured(ref a)) if a.loc_key.as_deref() == Some("K")));
        assert_eq!(aps.sound, Some(ApsSound::Name("default".into())));
    }

    #[test]
    fn custom_data_is_flattened() {
        let mut payload = ApnsPayload::default();
        let _ = payload.custom_data.insert("customKey".into(), json!("v"));
        payload.aps = Some(Aps {
            badge: Some(3),
            ..Aps::default()
        });
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"aps": {"badge": 3}, "customKey": "v"})
        );
    }
}
