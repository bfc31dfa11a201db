//! # helpdesk-runtime
//!
//! Case behavior that sits between the store and the transports:
//!
//! - **[`CaseLifecycle`]**: the case state machine, access rules for reads,
//!   and resolution with analysis.
//! - **[`LifecycleSweeper`]**: the hourly auto-resolve and retention task.
//! - **[`analytics`]**: the lead-agent dashboard aggregation.

#![deny(unsafe_code)]

pub mod analytics;
pub mod lifecycle;
pub mod sweeper;

#[cfg(test)]
mod test_support;

pub use analytics::{AnalyticsReport, analytics, build_report};
pub use lifecycle::{CaseDetails, CaseLifecycle};
pub use sweeper::{LifecycleSweeper, SweepReport, SweeperConfig, synthetic_analysis};
