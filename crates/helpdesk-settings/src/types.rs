//! Settings schema. Serialized as camelCase JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelpdeskSettings {
    /// HTTP / WebSocket server.
    pub server: ServerSettings,
    /// SQLite database.
    pub database: DatabaseSettings,
    /// Token verification.
    pub auth: AuthSettings,
    /// Analysis service client.
    pub analysis: AnalysisSettings,
    /// Case lifecycle and sweep policy.
    pub lifecycle: LifecycleSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl HelpdeskSettings {
    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(crate::SettingsError::InvalidValue(
                "auth.jwtSecret must be set (or JWT_SECRET)".into(),
            ));
        }
        if self.database.pool_size == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "database.poolSize must be at least 1".into(),
            ));
        }
        if self.lifecycle.sweep_interval_secs == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "lifecycle.sweepIntervalSecs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP / WebSocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port (0 picks a free port).
    pub port: u16,
    /// Max inbound WebSocket frame size in bytes.
    pub max_message_size: usize,
    /// Seconds between server pings.
    pub ping_interval_secs: u64,
    /// Seconds without a pong before a client is dropped.
    pub pong_timeout_secs: u64,
    /// Per-connection outbound queue capacity.
    pub outbound_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_message_size: 64 * 1024,
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            outbound_buffer: 256,
        }
    }
}

/// Database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file path. Empty means `~/.helpdesk/helpdesk.db`;
    /// `:memory:` means a private in-memory database.
    pub path: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            pool_size: 16,
            busy_timeout_ms: 30_000,
        }
    }
}

impl DatabaseSettings {
    /// Special path value selecting an in-memory database.
    pub const IN_MEMORY: &'static str = ":memory:";

    /// Whether this configures an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path == Self::IN_MEMORY
    }

    /// The database file path with the empty default resolved.
    pub fn resolved_path(&self) -> String {
        if self.path.is_empty() {
            crate::loader::helpdesk_dir()
                .join("helpdesk.db")
                .to_string_lossy()
                .into_owned()
        } else {
            self.path.clone()
        }
    }
}

/// Authentication settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HS256 secret for bearer tokens.
    pub jwt_secret: String,
}

/// Analysis service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    /// API base URL.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: String::new(),
            model: "gemini-2.5-flash".into(),
            timeout_ms: 30_000,
        }
    }
}

impl AnalysisSettings {
    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Lifecycle policy settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleSettings {
    /// Seconds between sweeps.
    pub sweep_interval_secs: u64,
    /// Age in seconds after which open cases auto-resolve and messages are purged.
    pub staleness_threshold_secs: u64,
    /// Maximum chat message length in characters.
    pub max_message_chars: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 3_600,
            staleness_threshold_secs: 86_400,
            max_message_chars: 5_000,
        }
    }
}

impl LifecycleSettings {
    /// Sweep period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Staleness threshold.
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_threshold_secs)
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}
