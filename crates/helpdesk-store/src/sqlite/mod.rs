//! `SQLite` backend for the case store.
//!
//! - **[`connection`]**: `r2d2` pool with WAL mode and foreign keys applied to
//!   every connection.
//! - **[`migrations`]**: version-tracked schema, embedded at compile time and
//!   applied transactionally.
//! - **[`row_types`]**: raw row structs and their conversion to domain types.
//! - **[`repositories`]**: stateless repository structs over `&Connection`.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;

pub use connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, PragmaState, new_file, new_in_memory,
    open, verify_pragmas,
};
pub use migrations::{current_version, latest_version, run_migrations};
