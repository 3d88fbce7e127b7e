//! Layered settings loading.
//!
//! Compiled defaults come first; a user file at `~/.accord/settings.json`
//! is folded over them key by key; environment variables win last. The
//! fold is a deep merge, so a user file holding only
//! `{"queue": {"capMs": 3000}}` changes exactly that knob and nothing
//! else.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::ClientSettings;

/// Where the user settings file lives: `$HOME/.accord/settings.json`.
///
/// Falls back to `/tmp` when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    [home.as_str(), ".accord", "settings.json"].iter().collect()
}

/// Load from the default location, then apply environment overrides.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load from `path`, then apply environment overrides.
///
/// A missing file is not an error (defaults apply); a present but
/// unparsable file is.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    let mut merged = serde_json::to_value(ClientSettings::default())?;

    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(?path, "merging settings file over defaults");
            deep_merge(&mut merged, serde_json::from_str(&content)?);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(?path, "no settings file; using defaults");
        }
        Err(e) => return Err(e.into()),
    }

    let mut settings: ClientSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Fold `overlay` into `base`, in place.
///
/// Object keys merge recursively; any other overlay value wins outright.
/// A `null` in the overlay is skipped, so a sparse user file cannot
/// erase a compiled default.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Recognized variables: `ACCORD_GATEWAY_URL`, `ACCORD_REST_BASE_URL`,
/// `ACCORD_PROBE_URL`, `ACCORD_ENABLE_GATEWAY`, `ACCORD_MAX_SHUTDOWN_TIME_MS`.
fn apply_env_overrides(settings: &mut ClientSettings) {
    if let Ok(url) = std::env::var("ACCORD_GATEWAY_URL") {
        debug!("overriding gateway url from environment");
        settings.gateway_url = url;
    }
    if let Ok(url) = std::env::var("ACCORD_REST_BASE_URL") {
        debug!("overriding rest base url from environment");
        settings.rest_base_url = url;
    }
    if let Ok(url) = std::env::var("ACCORD_PROBE_URL") {
        settings.probe_url = url;
    }
    if let Ok(enabled) = std::env::var("ACCORD_ENABLE_GATEWAY") {
        settings.enable_gateway = enabled != "false" && enabled != "0";
    }
    if let Ok(ms) = std::env::var("ACCORD_MAX_SHUTDOWN_TIME_MS") {
        if let Ok(parsed) = ms.parse::<u64>() {
            settings.max_shutdown_time_ms = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn merged(mut base: Value, overlay: Value) -> Value {
        deep_merge(&mut base, overlay);
        base
    }

    #[test]
    fn deep_merge_overrides_scalars() {
        let out = merged(json!({"a": 1, "b": "keep"}), json!({"a": 2}));
        assert_eq!(out["a"], 2);
        assert_eq!(out["b"], "keep");
    }

    #[test]
    fn deep_merge_recurses_into_objects() {
        let out = merged(
            json!({"cache": {"guilds": true, "roles": true}}),
            json!({"cache": {"roles": false}}),
        );
        assert_eq!(out["cache"]["guilds"], true);
        assert_eq!(out["cache"]["roles"], false);
    }

    #[test]
    fn deep_merge_replaces_arrays() {
        let out = merged(json!({"xs": [1, 2, 3]}), json!({"xs": [9]}));
        assert_eq!(out["xs"], json!([9]));
    }

    #[test]
    fn deep_merge_skips_nulls() {
        let out = merged(json!({"a": 1}), json!({"a": null}));
        assert_eq!(out["a"], 1);
    }

    #[test]
    fn deep_merge_adds_new_keys() {
        let out = merged(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(out["a"], 1);
        assert_eq!(out["b"], 2);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let settings = load_settings_from_path(&path).unwrap();
        assert!(settings.enable_gateway);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"basicCache": true, "queue": {{"capMs": 3000}}}}"#
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert!(settings.basic_cache);
        assert_eq!(settings.queue.cap_ms, 3000);
        // untouched defaults survive
        assert_eq!(settings.queue.start_delay_ms, 500);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }
}
