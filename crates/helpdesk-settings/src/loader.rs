//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{HelpdeskSettings, LogFormat};

/// The `~/.helpdesk` directory holding settings and the default database.
pub fn helpdesk_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".helpdesk")
}

/// Resolve the path to the settings file (`~/.helpdesk/settings.json`).
pub fn settings_path() -> PathBuf {
    helpdesk_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HelpdeskSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HelpdeskSettings> {
    let defaults = serde_json::to_value(HelpdeskSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: HelpdeskSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut HelpdeskSettings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary key lookup.
///
/// Empty and unparseable values are ignored (with a warning for the latter),
/// falling back to file/default values.
pub fn apply_overrides_from(settings: &mut HelpdeskSettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let ranged = |key: &str, min: u64, max: u64| -> Option<u64> {
        let raw = string(key)?;
        let parsed = parse_u64_range(&raw, min, max);
        if parsed.is_none() {
            warn!(key, value = %raw, "invalid numeric env var, ignoring");
        }
        parsed
    };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = string("HELPDESK_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = ranged("HELPDESK_PORT", 0, 65_535).and_then(|v| u16::try_from(v).ok()) {
        settings.server.port = v;
    }

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = string("HELPDESK_DB_PATH") {
        settings.database.path = v;
    }

    // ── Auth ────────────────────────────────────────────────────────
    if let Some(v) = string("JWT_SECRET") {
        settings.auth.jwt_secret = v;
    }

    // ── Analysis ────────────────────────────────────────────────────
    if let Some(v) = string("GEMINI_API_KEY") {
        settings.analysis.api_key = v;
    }
    if let Some(v) = string("HELPDESK_ANALYSIS_URL") {
        settings.analysis.base_url = v;
    }
    if let Some(v) = string("HELPDESK_ANALYSIS_MODEL") {
        settings.analysis.model = v;
    }
    if let Some(v) = ranged("HELPDESK_ANALYSIS_TIMEOUT_MS", 100, 600_000) {
        settings.analysis.timeout_ms = v;
    }

    // ── Lifecycle ───────────────────────────────────────────────────
    if let Some(v) = ranged("HELPDESK_SWEEP_INTERVAL_SECS", 1, 86_400) {
        settings.lifecycle.sweep_interval_secs = v;
    }
    if let Some(v) = ranged("HELPDESK_STALENESS_SECS", 60, 30 * 86_400) {
        settings.lifecycle.staleness_threshold_secs = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("HELPDESK_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = string("HELPDESK_LOG_FORMAT") {
        match serde_json::from_value::<LogFormat>(Value::String(v.to_lowercase())) {
            Ok(format) => settings.logging.format = format,
            Err(_) => warn!(value = %v, "invalid HELPDESK_LOG_FORMAT, ignoring"),
        }
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
