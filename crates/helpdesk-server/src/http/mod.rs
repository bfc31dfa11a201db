//! REST surface: complaints, analytics, health and metrics.

pub mod auth;
pub mod error;
pub mod routes;
