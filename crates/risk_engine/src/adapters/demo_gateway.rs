// Rust guideline compliant 2026-03-02

//! Demo adapter for the `PaymentGateway` port.
//!
//! Keeps executed refunds in a map keyed by idempotency key, so a repeated
//! call with the same key returns the original receipt instead of moving
//! money twice. Can be scripted to decline the next N refunds to exercise
//! the failure and retry paths.

use domain::{PaymentError, PaymentGateway, RefundReceipt};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// `PaymentGateway` adapter backed by an in-memory refund ledger.
#[derive(Debug, Default)]
pub struct DemoGateway {
    refunds: RefCell<HashMap<String, RefundReceipt>>,
    fail_next: Cell<u32>,
}

impl DemoGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` refund attempts fail with `Unavailable`.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.set(count);
    }

    /// Number of refunds settled so far.
    #[must_use]
    pub fn settled_count(&self) -> usize {
        self.refunds.borrow().len()
    }
}

impl PaymentGateway for DemoGateway {
    async fn refund(
        &self,
        charge_ref: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> Result<RefundReceipt, PaymentError> {
        if let Some(existing) = self.refunds.borrow().get(idempotency_key) {
            tracing::debug!(idempotency_key, "demo_gateway.refund: replaying existing receipt");
            return Ok(existing.clone());
        }
        if self.fail_next.get() > 0 {
            self.fail_next.set(self.fail_next.get() - 1);
            return Err(PaymentError::Unavailable { reason: "scripted outage".to_owned() });
        }
        let receipt = RefundReceipt {
            external_refund_id: format!("re_demo_{}", self.refunds.borrow().len() + 1),
        };
        self.refunds.borrow_mut().insert(idempotency_key.to_owned(), receipt.clone());
        tracing::info!(
            charge_ref,
            amount_cents,
            external_refund_id = %receipt.external_refund_id,
            "demo_gateway.refund: settled"
        );
        Ok(receipt)
    }

    async fn lookup(&self, idempotency_key: &str) -> Result<Option<RefundReceipt>, PaymentError> {
        Ok(self.refunds.borrow().get(idempotency_key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_replays_the_original_receipt() {
        let gateway = DemoGateway::new();
        let first = gateway.refund("ch_1", 5_000, "case-1").await.unwrap();
        let second = gateway.refund("ch_1", 5_000, "case-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(gateway.settled_count(), 1);
    }

    #[tokio::test]
    async fn scripted_failure_then_recovery() {
        let gateway = DemoGateway::new();
        gateway.fail_next(1);
        let error = gateway.refund("ch_1", 5_000, "case-1").await.unwrap_err();
        assert!(matches!(error, PaymentError::Unavailable { .. }));
        assert!(gateway.lookup("case-1").await.unwrap().is_none());

        let receipt = gateway.refund("ch_1", 5_000, "case-1").await.unwrap();
        assert_eq!(gateway.lookup("case-1").await.unwrap(), Some(receipt));
    }
}
