// Rust guideline compliant 2026-03-02

//! Case lifecycle driver: claims a case, executes the refund through the
//! payment port, and settles the case as `Completed` or `Failed`.
//!
//! The case id doubles as the gateway idempotency key, so no case can ever
//! move money twice: a retry after an ambiguous outcome first asks the
//! gateway whether the refund already went through.

use crate::dispatch;
use chrono::{DateTime, Utc};
use domain::{
    AutoRefundCase, CaseStatus, CaseStore, Clock, Notifier, PaymentGateway, StoreError,
    TimelineEntry,
};
use uuid::Uuid;

/// Errors from case processing.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    /// Persistence failure, including claim conflicts.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The trigger demands a human decision; use `approve` instead.
    #[error("case {case_id} requires manual review")]
    ReviewRequired {
        /// The gated case.
        case_id: Uuid,
    },
}

/// Drives refund cases through their state machine.
///
/// Stateless; every method takes its collaborators per call so tests can
/// swap in scripted adapters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseManager;

impl CaseManager {
    /// Process a `Pending` case automatically.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::ReviewRequired`] when the trigger is gated on
    /// manual review, [`CaseError::Store`] on persistence failures
    /// including a lost claim. A declined refund is not an error: the case
    /// comes back `Failed`.
    pub async fn process<S, G, N, C>(
        &self,
        case_id: Uuid,
        store: &S,
        gateway: &G,
        notifier: &N,
        clock: &C,
    ) -> Result<AutoRefundCase, CaseError>
    where
        S: CaseStore,
        G: PaymentGateway,
        N: Notifier,
        C: Clock,
    {
        let case = store
            .fetch_case(case_id)
            .await?
            .ok_or(StoreError::NotFound { entity: "case", id: case_id })?;
        if case.trigger.requires_manual_review {
            return Err(CaseError::ReviewRequired { case_id });
        }
        self.drive(case_id, CaseStatus::Pending, None, false, store, gateway, notifier, clock)
            .await
    }

    /// Approve a review-gated `Pending` case on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::Store`] on persistence failures including a
    /// lost claim.
    pub async fn approve<S, G, N, C>(
        &self,
        case_id: Uuid,
        actor: &str,
        store: &S,
        gateway: &G,
        notifier: &N,
        clock: &C,
    ) -> Result<AutoRefundCase, CaseError>
    where
        S: CaseStore,
        G: PaymentGateway,
        N: Notifier,
        C: Clock,
    {
        self.drive(
            case_id,
            CaseStatus::Pending,
            Some(actor),
            false,
            store,
            gateway,
            notifier,
            clock,
        )
        .await
    }

    /// Re-drive a `Failed` case. Before attempting a new refund the gateway
    /// is asked whether the previous attempt already settled under the
    /// case's idempotency key; if so the case completes without moving
    /// money again.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::Store`] on persistence failures including a
    /// lost claim.
    pub async fn retry<S, G, N, C>(
        &self,
        case_id: Uuid,
        actor: &str,
        store: &S,
        gateway: &G,
        notifier: &N,
        clock: &C,
    ) -> Result<AutoRefundCase, CaseError>
    where
        S: CaseStore,
        G: PaymentGateway,
        N: Notifier,
        C: Clock,
    {
        self.drive(case_id, CaseStatus::Failed, Some(actor), true, store, gateway, notifier, clock)
            .await
    }

    /// Reject a `Pending` case on behalf of `actor`. Terminal; the renter
    /// is notified, no money moves.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::Store`] on persistence failures, including
    /// [`StoreError::Conflict`] when the case is no longer `Pending`.
    pub async fn reject<S, N, C>(
        &self,
        case_id: Uuid,
        actor: &str,
        store: &S,
        notifier: &N,
        clock: &C,
    ) -> Result<AutoRefundCase, CaseError>
    where
        S: CaseStore,
        N: Notifier,
        C: Clock,
    {
        let now = clock.now();
        let entry = TimelineEntry::new(now, "case_rejected", "refund rejected after review")
            .with_actor(actor);
        let case = store.mark_cancelled(case_id, entry).await?;
        tracing::info!(case_id = %case.id, actor, "case rejected");
        dispatch::notify_case_outcome(&case, notifier).await;
        Ok(case)
    }

    /// Claim the case, execute the refund, settle the outcome.
    #[expect(clippy::too_many_arguments, reason = "per-call port injection")]
    async fn drive<S, G, N, C>(
        &self,
        case_id: Uuid,
        expected: CaseStatus,
        actor: Option<&str>,
        check_existing: bool,
        store: &S,
        gateway: &G,
        notifier: &N,
        clock: &C,
    ) -> Result<AutoRefundCase, CaseError>
    where
        S: CaseStore,
        G: PaymentGateway,
        N: Notifier,
        C: Clock,
    {
        let now = clock.now();
        let mut entry = TimelineEntry::new(now, "processing_started", "refund processing started");
        if let Some(actor) = actor {
            entry = entry.with_actor(actor);
        }
        let claimed = store.begin_processing(case_id, expected, entry).await?;
        let idempotency_key = claimed.id.to_string();

        if check_existing {
            match gateway.lookup(&idempotency_key).await {
                Ok(Some(receipt)) => {
                    tracing::info!(
                        case_id = %claimed.id,
                        external_refund_id = %receipt.external_refund_id,
                        "previous refund attempt already settled"
                    );
                    return self
                        .complete(claimed.id, &receipt.external_refund_id, now, store, notifier)
                        .await;
                }
                Ok(None) => {}
                Err(error) => {
                    // Cannot rule out a settled refund; park the case again.
                    return self
                        .fail(claimed.id, &format!("refund lookup failed: {error}"), now, store, notifier)
                        .await;
                }
            }
        }

        if claimed.refund_amount_cents == 0 {
            // Nothing to move; settle immediately.
            return self.complete(claimed.id, "no_charge", now, store, notifier).await;
        }

        match gateway
            .refund(&claimed.charge_ref, claimed.refund_amount_cents, &idempotency_key)
            .await
        {
            Ok(receipt) => {
                self.complete(claimed.id, &receipt.external_refund_id, now, store, notifier).await
            }
            Err(error) => self.fail(claimed.id, &error.to_string(), now, store, notifier).await,
        }
    }

    async fn complete<S, N>(
        &self,
        case_id: Uuid,
        external_refund_id: &str,
        now: DateTime<Utc>,
        store: &S,
        notifier: &N,
    ) -> Result<AutoRefundCase, CaseError>
    where
        S: CaseStore,
        N: Notifier,
    {
        let entry = TimelineEntry::new(now, "refund_completed", "refund executed")
            .with_metadata(serde_json::json!({ "external_refund_id": external_refund_id }));
        let case = store.mark_completed(case_id, external_refund_id, entry).await?;
        tracing::info!(
            case_id = %case.id,
            booking_id = %case.booking_id,
            amount_cents = case.refund_amount_cents,
            external_refund_id,
            "refund completed"
        );
        dispatch::notify_case_outcome(&case, notifier).await;
        Ok(case)
    }

    async fn fail<S, N>(
        &self,
        case_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
        store: &S,
        notifier: &N,
    ) -> Result<AutoRefundCase, CaseError>
    where
        S: CaseStore,
        N: Notifier,
    {
        let entry = TimelineEntry::new(now, "refund_failed", reason);
        let case = store.mark_failed(case_id, reason, entry).await?;
        tracing::warn!(case_id = %case.id, booking_id = %case.booking_id, reason, "refund failed");
        dispatch::notify_case_outcome(&case, notifier).await;
        Ok(case)
    }
}
