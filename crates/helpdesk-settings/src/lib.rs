//! # helpdesk-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** [`HelpdeskSettings::default()`]
//! 2. **Settings file** `~/.helpdesk/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** `HELPDESK_*`, `JWT_SECRET`, `GEMINI_API_KEY`

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, helpdesk_dir, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_resolution() {
        let mut db = DatabaseSettings::default();
        assert!(db.resolved_path().ends_with("helpdesk.db"));
        assert!(!db.is_in_memory());
        db.path = DatabaseSettings::IN_MEMORY.into();
        assert!(db.is_in_memory());
        db.path = "/var/lib/helpdesk/cases.db".into();
        assert_eq!(db.resolved_path(), "/var/lib/helpdesk/cases.db");
    }

    #[test]
    fn defaults_match_lifecycle_policy() {
        let s = HelpdeskSettings::default();
        assert_eq!(s.lifecycle.sweep_interval_secs, 3_600);
        assert_eq!(s.lifecycle.staleness_threshold_secs, 86_400);
        assert_eq!(s.lifecycle.max_message_chars, 5_000);
        assert_eq!(s.server.port, 3000);
    }

    #[test]
    fn validate_requires_jwt_secret() {
        let mut s = HelpdeskSettings::default();
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
        s.auth.jwt_secret = "secret".into();
        assert!(s.validate().is_ok());
        s.database.pool_size = 0;
        assert!(s.validate().is_err());
    }
}
