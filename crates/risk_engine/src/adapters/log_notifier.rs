// Rust guideline compliant 2026-03-02

//! Demo adapter for the `Notifier` port.
//!
//! Logs every notification via `tracing` and always returns `Ok(())`.
//! `NotifyError::DeliveryFailed` is unreachable in this demo adapter.

use domain::{Audience, Notification, Notifier, NotifyError};

/// `Notifier` adapter that emits one log line per notification.
///
/// Always returns `Ok(())`; swap in a real queue adapter for delivery.
#[derive(Debug)]
pub struct LogNotifier;

impl LogNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    async fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        let audience = match notification.audience {
            Audience::Admin => "admin".to_owned(),
            Audience::User(id) => format!("user:{id}"),
        };
        tracing::info!(
            topic = %notification.topic,
            audience = %audience,
            booking_id = ?notification.booking_id,
            case_id = ?notification.case_id,
            body = %notification.body,
            "log_notifier.enqueue"
        );
        Ok(())
    }
}
