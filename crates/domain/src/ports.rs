// Rust guideline compliant 2026-03-02

//! Hexagonal ports: the contracts the engine expects from its external
//! collaborators (persistence, payment, notification, clock).
//!
//! Implementations live outside the pipeline crates (in the binary crate or
//! in test modules). Components depend exclusively on these traits -- never
//! on a concrete adapter.

use crate::booking::{BookingRecord, GeoPoint};
use crate::case::{AutoRefundCase, CaseStatus, TimelineEntry};
use crate::score::FraudScore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"case"` or `"booking"`.
        entity: &'static str,
        id: Uuid,
    },
    /// A conditional update found the record in an unexpected status.
    #[error("conditional update conflict: expected {expected}, found {actual}")]
    Conflict {
        expected: CaseStatus,
        actual: CaseStatus,
    },
    /// The store could not be reached or the operation failed outright.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// The gateway rejected the refund.
    #[error("refund declined: {reason}")]
    Declined {
        /// Human-readable description.
        reason: String,
    },
    /// The gateway could not be reached.
    #[error("payment service unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// Notification could not be enqueued. Never fatal to state transitions.
    #[error("delivery failed: {reason}")]
    DeliveryFailed {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Time source port. All 24h/12h/2h window arithmetic goes through this so
/// time-dependent rules are testable without sleeping.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

// ---------------------------------------------------------------------------
// EvidenceStore
// ---------------------------------------------------------------------------

/// Read-side port for signal collectors. One method per evidence category;
/// every method is side-effect free.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait EvidenceStore {
    /// Bookings created by `user_id` at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn count_recent_bookings(&self, user_id: Uuid, since: DateTime<Utc>)
    -> Result<u32, StoreError>;

    /// Failed payment attempts by `user_id` at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn count_failed_payments(&self, user_id: Uuid, since: DateTime<Utc>)
    -> Result<u32, StoreError>;

    /// Locations of the user's most recent bookings, newest first, at most
    /// `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn booking_locations(&self, user_id: Uuid, limit: usize)
    -> Result<Vec<GeoPoint>, StoreError>;

    /// Distinct device fingerprints seen for `user_id` at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn device_fingerprints(&self, user_id: Uuid, since: DateTime<Utc>)
    -> Result<Vec<String>, StoreError>;

    /// The user's most recent outbound messages, newest first, at most
    /// `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn recent_messages(&self, user_id: Uuid, limit: usize)
    -> Result<Vec<String>, StoreError>;

    /// Payment methods added by `user_id` at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn count_payment_methods_added(&self, user_id: Uuid, since: DateTime<Utc>)
    -> Result<u32, StoreError>;
}

// ---------------------------------------------------------------------------
// ScoreAudit
// ---------------------------------------------------------------------------

/// Write-side port for the fraud-score audit trail.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait ScoreAudit {
    /// Persist one immutable verdict.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure. Callers treat
    /// audit failures as non-fatal (logged, scoring still returns).
    async fn record_score(&self, score: &FraudScore) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// BookingStore
// ---------------------------------------------------------------------------

/// An active booking whose owner has gone silent on an open high/urgent
/// issue -- candidate for `unresponsive_during_rental`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresponsiveCandidate {
    pub booking: BookingRecord,
    /// The stale issue that triggered the candidacy.
    pub issue_id: Uuid,
    pub issue_opened_at: DateTime<Utc>,
}

/// Read-side port for the trigger monitor's candidate queries. Each query
/// expresses one trigger condition; cutoffs are computed by the caller from
/// the injected clock so the store stays dumb.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait BookingStore {
    /// Point read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn fetch_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, StoreError>;

    /// Pending bookings created at or before `created_before` with no
    /// message from the owner, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn pending_without_owner_response(
        &self,
        created_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError>;

    /// Confirmed bookings whose scheduled start is at or before
    /// `started_before` with neither pickup nor delivery confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn confirmed_no_shows(
        &self,
        started_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError>;

    /// Active bookings with an open high/urgent issue opened at or before
    /// `issue_open_before` and no owner message since the issue opened.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn active_unresponsive(
        &self,
        issue_open_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<UnresponsiveCandidate>, StoreError>;

    /// Bookings cancelled by the owner where the cancellation happened
    /// within `window_hours` of the scheduled start.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn late_owner_cancellations(
        &self,
        window_hours: u32,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError>;
}

// ---------------------------------------------------------------------------
// CaseStore
// ---------------------------------------------------------------------------

/// Outcome of a conditional case creation.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseCreation {
    /// No open case existed; the new case was written.
    Created(AutoRefundCase),
    /// An open case for the same `(booking_id, trigger_event)` already
    /// exists; nothing was written.
    DuplicateOpen,
}

/// Write-side port for the refund-case state machine. Every transition
/// method appends the supplied timeline entry and bumps `updated_at` as part
/// of the same write.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait CaseStore {
    /// Conditionally create `case`: refuse when an open case with the same
    /// `(booking_id, trigger_event)` exists. Must be a transactional or
    /// unique-constraint write, not check-then-write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure; no partial
    /// case may be left behind.
    async fn create_if_absent(&self, case: AutoRefundCase) -> Result<CaseCreation, StoreError>;

    /// Point read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn fetch_case(&self, id: Uuid) -> Result<Option<AutoRefundCase>, StoreError>;

    /// Conditional claim: `expected -> Processing`, setting
    /// `refund.initiated_at` to the entry timestamp. This is the single
    /// in-flight marker -- two concurrent attempts cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the case is not in `expected`,
    /// [`StoreError::NotFound`] when it does not exist.
    async fn begin_processing(
        &self,
        id: Uuid,
        expected: CaseStatus,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError>;

    /// `Processing -> Completed`: record the external refund id and, in the
    /// same atomic write, flip the booking to `Refunded` with the case's
    /// refund amount and id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the case is not `Processing`.
    async fn mark_completed(
        &self,
        id: Uuid,
        external_refund_id: &str,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError>;

    /// `Processing -> Failed`: record the failure reason. The booking is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the case is not `Processing`.
    async fn mark_failed(
        &self,
        id: Uuid,
        reason: &str,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError>;

    /// `Pending -> Cancelled` (manual rejection). Terminal; never refunds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the case is not `Pending`.
    async fn mark_cancelled(&self, id: Uuid, entry: TimelineEntry)
    -> Result<AutoRefundCase, StoreError>;

    /// Pending cases whose trigger requires manual review -- the admin
    /// collaborator's work queue.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on store failure.
    async fn open_cases_requiring_review(&self) -> Result<Vec<AutoRefundCase>, StoreError>;
}

// ---------------------------------------------------------------------------
// PaymentGateway
// ---------------------------------------------------------------------------

/// Receipt for an executed refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    /// Refund reference at the payment collaborator.
    pub external_refund_id: String,
}

/// Payment collaborator port. Implementations must honor idempotency keys:
/// repeated calls with the same key have at-most-once financial effect.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait PaymentGateway {
    /// Refund `amount_cents` of the charge behind `charge_ref`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Declined`] or [`PaymentError::Unavailable`].
    async fn refund(
        &self,
        charge_ref: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> Result<RefundReceipt, PaymentError>;

    /// Look up a refund previously attempted under `idempotency_key`,
    /// without side effects. Used to resolve ambiguous outcomes before a
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Unavailable`] when the gateway cannot answer.
    async fn lookup(&self, idempotency_key: &str) -> Result<Option<RefundReceipt>, PaymentError>;
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Admin,
    User(Uuid),
}

/// A fire-and-forget notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Routing topic, e.g. `auto_refund_failed`.
    pub topic: String,
    pub audience: Audience,
    pub booking_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub body: String,
}

impl Notification {
    /// Admin-addressed notification.
    #[must_use]
    pub fn admin(topic: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            audience: Audience::Admin,
            booking_id: None,
            case_id: None,
            body: body.into(),
        }
    }

    /// User-addressed notification.
    #[must_use]
    pub fn user(user_id: Uuid, topic: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            audience: Audience::User(user_id),
            booking_id: None,
            case_id: None,
            body: body.into(),
        }
    }

    /// Attach the related booking.
    #[must_use]
    pub fn about_booking(mut self, booking_id: Uuid) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    /// Attach the related case.
    #[must_use]
    pub fn about_case(mut self, case_id: Uuid) -> Self {
        self.case_id = Some(case_id);
        self
    }
}

/// Notification collaborator port. Failures are logged by callers, never
/// fatal to state transitions.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait Notifier {
    /// Enqueue one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::DeliveryFailed`] when enqueueing fails.
    async fn enqueue(&self, notification: Notification) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
