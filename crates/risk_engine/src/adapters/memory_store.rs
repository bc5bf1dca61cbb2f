// Rust guideline compliant 2026-03-02

//! In-memory adapter for the engine's store ports.
//!
//! One struct backs `BookingStore`, `CaseStore`, `EvidenceStore`, and
//! `ScoreAudit`, so the completed-refund write can flip the booking in the
//! same borrow the way the real database does in one transaction. Single
//! threaded by design (`RefCell`), matching the current-thread runtime.

use chrono::{DateTime, Duration, Utc};
use domain::{
    AutoRefundCase, BookingRecord, BookingStatus, BookingStore, CancelledBy, CaseCreation,
    CaseStatus, CaseStore, EvidenceStore, FraudScore, GeoPoint, ScoreAudit, StoreError,
    TimelineEntry, UnresponsiveCandidate,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// All engine state behind `RefCell`s.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bookings: RefCell<HashMap<Uuid, BookingRecord>>,
    /// Bookings whose owner has sent at least one message.
    owner_responded: RefCell<HashSet<Uuid>>,
    stale_issues: RefCell<Vec<UnresponsiveCandidate>>,
    cases: RefCell<HashMap<Uuid, AutoRefundCase>>,
    scores: RefCell<Vec<FraudScore>>,
    failed_payments: RefCell<Vec<(Uuid, DateTime<Utc>)>>,
    locations: RefCell<Vec<(Uuid, GeoPoint)>>,
    devices: RefCell<Vec<(Uuid, String, DateTime<Utc>)>>,
    messages: RefCell<Vec<(Uuid, String)>>,
    payment_methods: RefCell<Vec<(Uuid, DateTime<Utc>)>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---- seeding helpers ----

    pub fn insert_booking(&self, booking: BookingRecord) -> Uuid {
        let id = booking.id;
        self.bookings.borrow_mut().insert(id, booking);
        id
    }

    /// Mark that the owner answered the booking request, removing the
    /// booking from the no-initial-response candidate set.
    pub fn record_owner_response(&self, booking_id: Uuid) {
        self.owner_responded.borrow_mut().insert(booking_id);
    }

    pub fn add_stale_issue(&self, candidate: UnresponsiveCandidate) {
        self.stale_issues.borrow_mut().push(candidate);
    }

    pub fn add_failed_payment(&self, user_id: Uuid, at: DateTime<Utc>) {
        self.failed_payments.borrow_mut().push((user_id, at));
    }

    pub fn add_booking_location(&self, user_id: Uuid, location: GeoPoint) {
        self.locations.borrow_mut().push((user_id, location));
    }

    pub fn add_device(&self, user_id: Uuid, fingerprint: impl Into<String>, at: DateTime<Utc>) {
        self.devices.borrow_mut().push((user_id, fingerprint.into(), at));
    }

    pub fn add_message(&self, user_id: Uuid, body: impl Into<String>) {
        self.messages.borrow_mut().push((user_id, body.into()));
    }

    pub fn add_payment_method(&self, user_id: Uuid, at: DateTime<Utc>) {
        self.payment_methods.borrow_mut().push((user_id, at));
    }

    // ---- inspection helpers for the demo summary ----

    #[must_use]
    pub fn booking(&self, id: Uuid) -> Option<BookingRecord> {
        self.bookings.borrow().get(&id).cloned()
    }

    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.borrow().len()
    }

    #[must_use]
    pub fn audited_scores(&self) -> Vec<FraudScore> {
        self.scores.borrow().clone()
    }

    fn transition(
        &self,
        id: Uuid,
        expected: CaseStatus,
        next: CaseStatus,
        entry: TimelineEntry,
        mutate: impl FnOnce(&mut AutoRefundCase),
    ) -> Result<AutoRefundCase, StoreError> {
        let mut cases = self.cases.borrow_mut();
        let case = cases
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "case", id })?;
        if case.status != expected {
            return Err(StoreError::Conflict { expected, actual: case.status });
        }
        case.status = next;
        mutate(case);
        case.record(entry);
        Ok(case.clone())
    }
}

impl BookingStore for MemoryStore {
    async fn fetch_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, StoreError> {
        Ok(self.bookings.borrow().get(&id).cloned())
    }

    async fn pending_without_owner_response(
        &self,
        created_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let responded = self.owner_responded.borrow();
        Ok(self
            .bookings
            .borrow()
            .values()
            .filter(|b| {
                b.status == BookingStatus::Pending
                    && b.created_at <= created_before
                    && !responded.contains(&b.id)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn confirmed_no_shows(
        &self,
        started_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self
            .bookings
            .borrow()
            .values()
            .filter(|b| {
                b.status == BookingStatus::Confirmed
                    && b.start_at <= started_before
                    && !b.pickup_confirmed
                    && !b.delivery_confirmed
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn active_unresponsive(
        &self,
        issue_open_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<UnresponsiveCandidate>, StoreError> {
        Ok(self
            .stale_issues
            .borrow()
            .iter()
            .filter(|c| c.issue_opened_at <= issue_open_before)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn late_owner_cancellations(
        &self,
        window_hours: u32,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self
            .bookings
            .borrow()
            .values()
            .filter(|b| {
                b.status == BookingStatus::Cancelled
                    && b.cancelled_by == Some(CancelledBy::Owner)
                    && b.cancelled_at.is_some_and(|at| {
                        b.start_at - at <= Duration::hours(i64::from(window_hours))
                    })
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

impl CaseStore for MemoryStore {
    async fn create_if_absent(&self, case: AutoRefundCase) -> Result<CaseCreation, StoreError> {
        let duplicate = self.cases.borrow().values().any(|existing| {
            existing.booking_id == case.booking_id
                && existing.trigger.event == case.trigger.event
                && existing.status.is_open()
        });
        if duplicate {
            return Ok(CaseCreation::DuplicateOpen);
        }
        self.cases.borrow_mut().insert(case.id, case.clone());
        Ok(CaseCreation::Created(case))
    }

    async fn fetch_case(&self, id: Uuid) -> Result<Option<AutoRefundCase>, StoreError> {
        Ok(self.cases.borrow().get(&id).cloned())
    }

    async fn begin_processing(
        &self,
        id: Uuid,
        expected: CaseStatus,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        let at = entry.at;
        self.transition(id, expected, CaseStatus::Processing, entry, |case| {
            case.refund.initiated_at = Some(at);
            case.refund.failed_at = None;
            case.refund.failure_reason = None;
        })
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        external_refund_id: &str,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        let at = entry.at;
        let case =
            self.transition(id, CaseStatus::Processing, CaseStatus::Completed, entry, |case| {
                case.refund.completed_at = Some(at);
                case.refund.external_refund_id = Some(external_refund_id.to_owned());
            })?;
        // Same borrow scope as the case write stands in for the real
        // adapter's transaction.
        if let Some(booking) = self.bookings.borrow_mut().get_mut(&case.booking_id) {
            booking.status = BookingStatus::Refunded;
            booking.refund_amount_cents = Some(case.refund_amount_cents);
            booking.refund_reason = Some(case.trigger.event.as_str().to_owned());
            booking.refund_case_id = Some(case.id);
        }
        Ok(case)
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        reason: &str,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        let at = entry.at;
        self.transition(id, CaseStatus::Processing, CaseStatus::Failed, entry, |case| {
            case.refund.failed_at = Some(at);
            case.refund.failure_reason = Some(reason.to_owned());
        })
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        self.transition(id, CaseStatus::Pending, CaseStatus::Cancelled, entry, |_| {})
    }

    async fn open_cases_requiring_review(&self) -> Result<Vec<AutoRefundCase>, StoreError> {
        Ok(self
            .cases
            .borrow()
            .values()
            .filter(|c| c.status == CaseStatus::Pending && c.trigger.requires_manual_review)
            .cloned()
            .collect())
    }
}

impl EvidenceStore for MemoryStore {
    async fn count_recent_bookings(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let count = self
            .bookings
            .borrow()
            .values()
            .filter(|b| b.renter_id == user_id && b.created_at >= since)
            .count();
        #[expect(clippy::cast_possible_truncation, reason = "in-memory counts are small")]
        let count = count as u32;
        Ok(count)
    }

    async fn count_failed_payments(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let count = self
            .failed_payments
            .borrow()
            .iter()
            .filter(|(user, at)| *user == user_id && *at >= since)
            .count();
        #[expect(clippy::cast_possible_truncation, reason = "in-memory counts are small")]
        let count = count as u32;
        Ok(count)
    }

    async fn booking_locations(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<GeoPoint>, StoreError> {
        Ok(self
            .locations
            .borrow()
            .iter()
            .rev()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, location)| *location)
            .take(limit)
            .collect())
    }

    async fn device_fingerprints(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let mut distinct: Vec<String> = Vec::new();
        for (user, fingerprint, at) in self.devices.borrow().iter() {
            if *user == user_id && *at >= since && !distinct.contains(fingerprint) {
                distinct.push(fingerprint.clone());
            }
        }
        Ok(distinct)
    }

    async fn recent_messages(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .messages
            .borrow()
            .iter()
            .rev()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, body)| body.clone())
            .take(limit)
            .collect())
    }

    async fn count_payment_methods_added(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let count = self
            .payment_methods
            .borrow()
            .iter()
            .filter(|(user, at)| *user == user_id && *at >= since)
            .count();
        #[expect(clippy::cast_possible_truncation, reason = "in-memory counts are small")]
        let count = count as u32;
        Ok(count)
    }
}

impl ScoreAudit for MemoryStore {
    async fn record_score(&self, score: &FraudScore) -> Result<(), StoreError> {
        self.scores.borrow_mut().push(score.clone());
        Ok(())
    }
}
