//! Where courier settings come from.
//!
//! Compiled defaults, then `~/.courier/settings.json` overlaid on them, then
//! the `COURIER_*` variables. In the file layer nested objects overlay key by
//! key, any other value replaces what was there, and `null` leaves the
//! default alone.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::CourierSettings;

/// Accepted values of `COURIER_TIMEOUT_MS`.
pub const TIMEOUT_MS_RANGE: RangeInclusive<u64> = 1_000..=600_000;

/// `~/.courier/settings.json`.
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".courier").join("settings.json")
}

/// Settings from the default file and the process environment.
pub fn load_settings() -> Result<CourierSettings> {
    load_settings_from_path(&settings_path())
}

/// Settings from `path` and the process environment.
///
/// A missing file means defaults; an unreadable or malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CourierSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults overlaid with the file at `path`, ignoring the environment.
pub fn load_file(path: &Path) -> Result<CourierSettings> {
    let json_err = |source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    };
    let mut merged = serde_json::to_value(CourierSettings::default()).map_err(json_err)?;

    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "overlaying settings file");
            overlay(&mut merged, serde_json::from_str(&content).map_err(json_err)?);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    serde_json::from_value(merged).map_err(json_err)
}

/// Overlay `file` onto `base` in place.
pub fn overlay(base: &mut Value, file: Value) {
    match (base, file) {
        (Value::Object(base), Value::Object(file)) => {
            for (key, value) in file.into_iter().filter(|(_, v)| !v.is_null()) {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply the `COURIER_*` variables of the process environment.
pub fn apply_env_overrides(settings: &mut CourierSettings) {
    apply_overrides_from(settings, &|name| std::env::var(name).ok());
}

type Setter = fn(&mut CourierSettings, String) -> std::result::Result<(), &'static str>;

/// Each variable with the setting it overrides. Empty values are skipped.
const ENV_OVERRIDES: &[(&str, Setter)] = &[
    ("COURIER_SEND_URL", |s, v| {
        s.messaging.send_base_url = v;
        Ok(())
    }),
    ("COURIER_TOPIC_URL", |s, v| {
        s.messaging.topic_management_base_url = v;
        Ok(())
    }),
    ("COURIER_BATCH_URL", |s, v| {
        s.messaging.batch_url = v;
        Ok(())
    }),
    ("COURIER_TIMEOUT_MS", |s, v| {
        let ms = v
            .parse::<u64>()
            .ok()
            .filter(|ms| TIMEOUT_MS_RANGE.contains(ms))
            .ok_or("expected milliseconds between 1000 and 600000")?;
        s.messaging.timeout_ms = ms;
        Ok(())
    }),
    ("COURIER_LEGACY_TRANSPORT", |s, v| {
        s.messaging.legacy_http_transport = match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => return Err("expected true/false, 1/0, yes/no or on/off"),
        };
        Ok(())
    }),
    ("COURIER_PROJECT_ID", |s, v| {
        s.messaging.project_id = Some(v);
        Ok(())
    }),
    ("COURIER_LOG_LEVEL", |s, v| {
        s.logging.level = v;
        Ok(())
    }),
];

/// Apply overrides read through `lookup`. Invalid values are logged and skipped.
pub fn apply_overrides_from(settings: &mut CourierSettings, lookup: &dyn Fn(&str) -> Option<String>) {
    for (name, set) in ENV_OVERRIDES {
        let Some(value) = lookup(name).filter(|v| !v.is_empty()) else {
            continue;
        };
        if let Err(expected) = set(settings, value.clone()) {
            warn!(var = name, value = %value, expected, "ignoring courier env override");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
