//! # helpdesk-server
//!
//! Axum HTTP + `WebSocket` server for the helpdesk.
//!
//! - Case chat: per-case rooms ([`websocket::rooms::RoomRegistry`]) and one
//!   [`websocket::session::ChatSession`] per connection
//! - REST routes for complaints and analytics, bearer-token authenticated
//! - `/health` and Prometheus `/metrics`
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod http;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, HelpdeskServer};
pub use shutdown::{ShutdownCoordinator, wait_for_signal};
