// Rust guideline compliant 2026-03-02

//! Adapters (secondary ports) for the risk-engine binaries.
//!
//! Each sub-module implements one or more hexagonal port traits defined in
//! the `domain` crate. Adapters are intentionally isolated from the
//! scoring and refund pipeline crates.

pub mod demo_gateway;
pub mod log_notifier;
pub mod memory_store;
pub mod system_clock;
