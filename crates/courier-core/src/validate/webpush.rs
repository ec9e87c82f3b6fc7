use serde_json::{Map, Value};

use super::common::{object_field, validate_optional_url, validate_string_map};
use crate::errors::Result;

pub(super) fn validate_webpush_config(message: &mut Map<String, Value>) -> Result<()> {
    let Some(config) = object_field(message, "webpush", "webpush")? else {
        return Ok(());
    };
    validate_string_map(config, "headers", "webpush.headers")?;
    validate_string_map(config, "data", "webpush.data")?;
    let _ = object_field(config, "notification", "webpush.notification")?;
    if let Some(options) = object_field(config, "fcmOptions", "webpush.fcmOptions")? {
        validate_optional_url(options, "link", "webpush.fcmOptions.link")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(webpush: Value) -> Result<()> {
        let mut message = match json!({"webpush": webpush}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        validate_webpush_config(&mut message)
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(run(json!({
            "headers": {"TTL": "60"},
            "data": {"k": "v"},
            "notification": {"title": "t", "requireInteraction": true},
            "fcmOptions": {"link": "https://example.com/inbox"}
        }))
        .is_ok());
    }

    #[test]
    fn rejects_bad_blocks() {
        let field = |v: Value| run(v).unwrap_err().field().unwrap().to_string();
        assert_eq!(field(json!({"headers": {"TTL": 60}})), "webpush.headers.TTL");
        assert_eq!(field(json!({"notification": "hi"})), "webpush.notification");
        assert_eq!(field(json!({"fcmOptions": {"link": "inbox"}})), "webpush.fcmOptions.link");
        assert_eq!(field(json!("nope")), "webpush");
    }
}
