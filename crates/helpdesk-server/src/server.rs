//! `HelpdeskServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use helpdesk_auth::Authenticator;
use helpdesk_runtime::CaseLifecycle;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::http::routes;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::handler::chat_upgrade;
use crate::websocket::rooms::RoomRegistry;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Case state machine and read paths.
    pub lifecycle: Arc<CaseLifecycle>,
    /// Token verification.
    pub authenticator: Arc<dyn Authenticator>,
    /// Live chat rooms.
    pub rooms: Arc<RoomRegistry>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The helpdesk server. Owns the room registry for its lifetime.
pub struct HelpdeskServer {
    config: Arc<ServerConfig>,
    lifecycle: Arc<CaseLifecycle>,
    authenticator: Arc<dyn Authenticator>,
    rooms: Arc<RoomRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl HelpdeskServer {
    /// Create a server with an empty room registry.
    pub fn new(
        config: ServerConfig,
        lifecycle: Arc<CaseLifecycle>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            lifecycle,
            authenticator,
            rooms: Arc::new(RoomRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    fn state(&self) -> AppState {
        AppState {
            lifecycle: self.lifecycle.clone(),
            authenticator: self.authenticator.clone(),
            rooms: self.rooms.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.token(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        }
    }

    /// Build the router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/complaints",
                post(routes::create_complaint).get(routes::list_complaints),
            )
            .route("/complaints/{id}", get(routes::get_complaint))
            .route("/complaints/{id}/assign", post(routes::assign_complaint))
            .route("/complaints/{id}/resolve", post(routes::resolve_complaint))
            .route("/complaints/{id}/summarize", post(routes::summarize_complaint))
            .route("/analytics", get(routes::get_analytics))
            .route("/health", get(routes::health_handler))
            .route("/metrics", get(routes::metrics_handler))
            .route("/chat/{case_id}", get(chat_upgrade))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state())
    }

    /// Bind and serve in a background task until shutdown. Returns the
    /// bound address and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "server stopped with error");
            }
        });
        info!(%addr, "helpdesk server listening");
        Ok((addr, handle))
    }

    /// The live room registry.
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
