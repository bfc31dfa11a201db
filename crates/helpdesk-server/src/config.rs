//! Server configuration.

use std::time::Duration;

use helpdesk_core::constants::MAX_MESSAGE_CHARS;
use helpdesk_settings::HelpdeskSettings;

/// Runtime configuration for [`HelpdeskServer`](crate::server::HelpdeskServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Interval between server-initiated Ping frames.
    pub ping_interval: Duration,
    /// Silence after which a client is considered dead.
    pub pong_timeout: Duration,
    /// Per-connection outbound queue capacity.
    pub outbound_buffer: usize,
    /// Max chat message length in characters.
    pub max_message_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 64 * 1024,
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
            outbound_buffer: 256,
            max_message_chars: MAX_MESSAGE_CHARS,
        }
    }
}

impl From<&HelpdeskSettings> for ServerConfig {
    fn from(settings: &HelpdeskSettings) -> Self {
        let server = &settings.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            max_message_size: server.max_message_size,
            ping_interval: Duration::from_secs(server.ping_interval_secs),
            pong_timeout: Duration::from_secs(server.pong_timeout_secs),
            outbound_buffer: server.outbound_buffer.max(1),
            max_message_chars: settings.lifecycle.max_message_chars,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
