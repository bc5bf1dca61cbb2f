// Rust guideline compliant 2026-03-02

//! Automatic-refund pipeline: trigger monitoring, case lifecycle
//! management, and action/notification dispatch.
//!
//! The [`monitor::TriggerMonitor`] detects stale bookings and opens cases;
//! the [`case_manager::CaseManager`] drives each case through
//! `Pending -> Processing -> {Completed | Failed}` with the case id as the
//! payment idempotency key; [`dispatch`] translates verdicts and case
//! outcomes into platform directives and notifications.

pub mod case_manager;
pub mod dispatch;
pub mod monitor;

pub use case_manager::{CaseError, CaseManager};
pub use dispatch::Directive;
pub use monitor::{MonitorConfig, MonitorError, PassSummary, TriggerMonitor};
