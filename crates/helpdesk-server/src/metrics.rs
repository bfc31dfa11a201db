//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Call once at startup,
/// before any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric names shared across crates.

/// Chat connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Chat connections closed (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open chat connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Chat connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Frames not delivered because a member's queue was full (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Connections rejected before joining a room (counter, labels: code).
pub const WS_REJECTIONS_TOTAL: &str = "ws_rejections_total";
/// Chat messages persisted (counter).
pub const CHAT_MESSAGES_TOTAL: &str = "chat_messages_total";
/// Sweep cycles started (counter).
pub const SWEEP_RUNS_TOTAL: &str = "sweep_runs_total";
/// Cases auto-resolved by the sweeper (counter).
pub const SWEEP_CASES_RESOLVED_TOTAL: &str = "sweep_cases_resolved_total";
/// Messages deleted by retention (counter).
pub const SWEEP_MESSAGES_DELETED_TOTAL: &str = "sweep_messages_deleted_total";
