// Rust guideline compliant 2026-03-02

//! Wall-clock adapter for the `Clock` port.

use chrono::{DateTime, Utc};
use domain::Clock;

/// `Clock` adapter backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
