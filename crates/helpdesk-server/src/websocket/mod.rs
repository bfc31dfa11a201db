//! Case chat over WebSocket.

pub mod connection;
pub mod handler;
pub mod protocol;
pub mod rooms;
pub mod session;
