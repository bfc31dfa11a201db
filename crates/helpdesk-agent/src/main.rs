//! # helpdesk
//!
//! Helpdesk server binary. Wires the store, analysis client, lifecycle,
//! sweeper and HTTP/WebSocket server together and runs until a signal.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use helpdesk_analysis::{GeminiAnalysisService, GeminiConfig};
use helpdesk_auth::JwtAuthenticator;
use helpdesk_runtime::{CaseLifecycle, LifecycleSweeper, SweeperConfig};
use helpdesk_server::{HelpdeskServer, ServerConfig, wait_for_signal};
use helpdesk_settings::{DatabaseSettings, HelpdeskSettings};
use helpdesk_store::SqliteCaseStore;

/// Customer-support helpdesk server.
#[derive(Parser, Debug)]
#[command(name = "helpdesk", about = "Customer-support helpdesk server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (defaults to `~/.helpdesk/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Load settings and fold the command-line overrides into them.
    fn resolve_settings(&self) -> Result<HelpdeskSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(helpdesk_settings::settings_path);
        let mut settings = helpdesk_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut HelpdeskSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(db_path) = &self.db_path {
            settings.database.path = db_path.to_string_lossy().into_owned();
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn open_store(settings: &DatabaseSettings) -> Result<SqliteCaseStore> {
    let mut settings = settings.clone();
    if !settings.is_in_memory() {
        settings.path = settings.resolved_path();
        ensure_parent_dir(Path::new(&settings.path))?;
    }
    SqliteCaseStore::open(&settings).context("Failed to open database")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.resolve_settings()?;

    helpdesk_logging::init_subscriber(&settings.logging.level, settings.logging.format);

    let store = Arc::new(open_store(&settings.database)?);

    if settings.analysis.api_key.is_empty() {
        tracing::warn!("no analysis API key configured; resolutions and summaries will fail upstream");
    }
    let analysis = Arc::new(GeminiAnalysisService::new(GeminiConfig::from(
        &settings.analysis,
    )));
    let lifecycle = Arc::new(CaseLifecycle::new(
        store,
        analysis,
        settings.analysis.timeout(),
    ));
    let authenticator = Arc::new(JwtAuthenticator::new(&settings.auth.jwt_secret));

    let mut server = HelpdeskServer::new(
        ServerConfig::from(&settings),
        lifecycle.clone(),
        authenticator,
    );
    match helpdesk_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics recorder unavailable; /metrics disabled"),
    }

    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind server")?;
    tracing::info!("helpdesk listening on http://{addr}");

    let sweeper = LifecycleSweeper::new(lifecycle, SweeperConfig::from(&settings.lifecycle))
        .spawn(server.shutdown().token());

    wait_for_signal().await;

    tracing::info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(vec![handle, sweeper], None)
        .await;

    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_override_nothing() {
        let cli = Cli::parse_from(["helpdesk"]);
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.db_path.is_none());
        assert!(cli.settings.is_none());
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::parse_from([
            "helpdesk",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--db-path",
            "/tmp/h.db",
            "--settings",
            "/tmp/s.json",
        ]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/h.db")));
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from(["helpdesk", "--port", "9000", "--db-path", "/tmp/x.db"]);
        let mut settings = HelpdeskSettings::default();
        let host = settings.server.host.clone();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, host);
        assert_eq!(settings.database.path, "/tmp/x.db");
    }

    #[test]
    fn settings_file_is_loaded_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"auth": {"jwtSecret": "s3cret"}, "server": {"port": 7001}}"#,
        )
        .unwrap();
        let cli = Cli::parse_from(["helpdesk", "--settings", path.to_str().unwrap()]);
        let settings = cli.resolve_settings().unwrap();
        assert_eq!(settings.server.port, 7001);
        assert_eq!(settings.auth.jwt_secret, "s3cret");
    }

    #[test]
    fn invalid_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let cli = Cli::parse_from(["helpdesk", "--settings", path.to_str().unwrap()]);
        assert!(cli.resolve_settings().is_err());
    }

    #[test]
    fn ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("helpdesk.db");
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn open_store_creates_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("helpdesk.db");
        let settings = DatabaseSettings {
            path: path.to_string_lossy().into_owned(),
            pool_size: 2,
            ..DatabaseSettings::default()
        };
        let _store = open_store(&settings).unwrap();
        assert!(path.exists());
    }
}
