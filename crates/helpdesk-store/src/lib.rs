//! # helpdesk-store
//!
//! The Case Store: persistence for cases, chat messages and analysis results.
//!
//! - **[`CaseStore`]**: the async contract the rest of the service depends on.
//! - **[`SqliteCaseStore`]**: its `SQLite` implementation (pooled connections,
//!   embedded migrations, stateless repositories).
//!
//! State-machine preconditions (assign only an OPEN unassigned case, resolve
//! only with an analysis result) are enforced by conditional statements and
//! backed by schema constraints, so they hold under concurrent writers.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod sqlite_store;
pub mod store;

pub use errors::{Result, StoreError};
pub use sqlite_store::SqliteCaseStore;
pub use store::{
    CaseFilter, CaseStore, CaseTransition, NewMessage, SentimentCounts, StaleCase,
};
