// Rust guideline compliant 2026-03-02

//! Trigger monitor: the periodic sweep that turns stale bookings into
//! refund cases.
//!
//! One pass scans the four trigger conditions, opens a case per newly
//! detected `(booking, trigger)` pair, and immediately drives the cases
//! whose trigger allows automatic processing. Detection is idempotent: an
//! open case for the same pair makes the store answer `DuplicateOpen` and
//! the pass moves on.

use crate::case_manager::CaseManager;
use chrono::{DateTime, Duration, Utc};
use domain::{
    AutoRefundCase, BookingRecord, BookingStore, CaseCreation, CaseStatus, CaseStore, Clock,
    Notifier, PaymentGateway, TriggerEvidence, UnresponsiveCandidate,
};
use rules::RuleRegistry;

/// Errors from monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    /// The builder was given an unusable value.
    #[error("invalid monitor config: {reason}")]
    InvalidConfig {
        /// Human-readable description.
        reason: String,
    },
}

/// Validated monitor configuration. Build via [`MonitorConfig::builder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    batch_limit: usize,
}

impl MonitorConfig {
    /// Start building a config.
    #[must_use]
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Maximum candidates fetched per trigger query in one pass.
    #[must_use]
    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }
}

/// Builder for [`MonitorConfig`].
#[derive(Debug, Clone, Default)]
pub struct MonitorConfigBuilder {
    batch_limit: Option<usize>,
}

impl MonitorConfigBuilder {
    /// Cap the candidates fetched per trigger query. Defaults to 100.
    #[must_use]
    pub fn batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = Some(batch_limit);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] when `batch_limit` is zero.
    pub fn build(self) -> Result<MonitorConfig, MonitorError> {
        let batch_limit = self.batch_limit.unwrap_or(100);
        if batch_limit == 0 {
            return Err(MonitorError::InvalidConfig {
                reason: "batch_limit must be at least 1".to_owned(),
            });
        }
        Ok(MonitorConfig { batch_limit })
    }
}

/// Counters for one monitor pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    /// Candidates examined across all triggers.
    pub scanned: u32,
    /// Fresh cases opened.
    pub cases_created: u32,
    /// Candidates skipped because an open case already covers the pair.
    pub duplicates_skipped: u32,
    /// Cases driven to `Completed` in this pass.
    pub auto_processed: u32,
    /// Query failures, refund failures, and processing errors.
    pub failures: u32,
}

/// Scans for trigger conditions and opens refund cases.
#[derive(Debug, Clone)]
pub struct TriggerMonitor {
    config: MonitorConfig,
    registry: RuleRegistry,
    manager: CaseManager,
}

impl TriggerMonitor {
    #[must_use]
    pub fn new(config: MonitorConfig, registry: RuleRegistry) -> Self {
        Self { config, registry, manager: CaseManager }
    }

    /// Run one detection pass. Bookings are processed one at a time; a
    /// failure on one candidate is counted and never aborts the pass.
    pub async fn run_pass<B, S, G, N, C>(
        &self,
        bookings: &B,
        cases: &S,
        gateway: &G,
        notifier: &N,
        clock: &C,
    ) -> PassSummary
    where
        B: BookingStore,
        S: CaseStore,
        G: PaymentGateway,
        N: Notifier,
        C: Clock,
    {
        let now = clock.now();
        let limit = self.config.batch_limit;
        let mut summary = PassSummary::default();

        for trigger in self.registry.refund_triggers() {
            let cutoff = now - Duration::hours(i64::from(trigger.timeout_hours));
            let candidates: Result<Vec<(BookingRecord, TriggerEvidence)>, _> = match trigger.event {
                domain::TriggerEvent::NoInitialResponse => bookings
                    .pending_without_owner_response(cutoff, limit)
                    .await
                    .map(|found| {
                        found
                            .into_iter()
                            .map(|b| {
                                let age = (now - b.created_at).num_hours();
                                (b, TriggerEvidence::NoInitialResponse { booking_age_hours: age })
                            })
                            .collect()
                    }),
                domain::TriggerEvent::NoShow => {
                    bookings.confirmed_no_shows(cutoff, limit).await.map(|found| {
                        found
                            .into_iter()
                            .map(|b| {
                                let past = (now - b.start_at).num_hours();
                                (b, TriggerEvidence::NoShow { hours_past_start: past })
                            })
                            .collect()
                    })
                }
                domain::TriggerEvent::UnresponsiveDuringRental => {
                    bookings.active_unresponsive(cutoff, limit).await.map(|found| {
                        found
                            .into_iter()
                            .map(|UnresponsiveCandidate { booking, issue_id, issue_opened_at }| {
                                let unresolved = (now - issue_opened_at).num_hours();
                                (
                                    booking,
                                    TriggerEvidence::UnresponsiveDuringRental {
                                        issue_id,
                                        unresolved_hours: unresolved,
                                    },
                                )
                            })
                            .collect()
                    })
                }
                domain::TriggerEvent::LateCancellationByOwner => bookings
                    .late_owner_cancellations(trigger.timeout_hours, limit)
                    .await
                    .map(|found| {
                        found
                            .into_iter()
                            .map(|b| {
                                let before = b
                                    .cancelled_at
                                    .map_or(0, |at| (b.start_at - at).num_hours());
                                (
                                    b,
                                    TriggerEvidence::LateCancellationByOwner {
                                        hours_before_start: before,
                                    },
                                )
                            })
                            .collect()
                    }),
            };

            let candidates = match candidates {
                Ok(candidates) => candidates,
                Err(error) => {
                    tracing::warn!(
                        trigger = trigger.event.as_str(),
                        %error,
                        "trigger query failed, skipping this trigger"
                    );
                    summary.failures += 1;
                    continue;
                }
            };

            for (booking, evidence) in candidates {
                summary.scanned += 1;
                self.handle_candidate(
                    &booking,
                    trigger.clone(),
                    evidence,
                    now,
                    cases,
                    gateway,
                    notifier,
                    clock,
                    &mut summary,
                )
                .await;
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            cases_created = summary.cases_created,
            duplicates_skipped = summary.duplicates_skipped,
            auto_processed = summary.auto_processed,
            failures = summary.failures,
            "monitor pass complete"
        );
        summary
    }

    #[expect(clippy::too_many_arguments, reason = "per-call port injection")]
    async fn handle_candidate<S, G, N, C>(
        &self,
        booking: &BookingRecord,
        trigger: domain::RefundTrigger,
        evidence: TriggerEvidence,
        now: DateTime<Utc>,
        cases: &S,
        gateway: &G,
        notifier: &N,
        clock: &C,
        summary: &mut PassSummary,
    ) where
        S: CaseStore,
        G: PaymentGateway,
        N: Notifier,
        C: Clock,
    {
        let requires_review = trigger.requires_manual_review;
        let case = AutoRefundCase::detect(booking, trigger, evidence, now);
        let case_id = case.id;

        match cases.create_if_absent(case).await {
            Ok(CaseCreation::Created(created)) => {
                summary.cases_created += 1;
                tracing::info!(
                    case_id = %created.id,
                    booking_id = %created.booking_id,
                    trigger = created.trigger.event.as_str(),
                    refund_cents = created.refund_amount_cents,
                    "refund case opened"
                );
                if requires_review {
                    return;
                }
                match self.manager.process(case_id, cases, gateway, notifier, clock).await {
                    Ok(settled) if settled.status == CaseStatus::Completed => {
                        summary.auto_processed += 1;
                    }
                    Ok(_) => summary.failures += 1,
                    Err(error) => {
                        tracing::warn!(case_id = %case_id, %error, "automatic processing failed");
                        summary.failures += 1;
                    }
                }
            }
            Ok(CaseCreation::DuplicateOpen) => {
                summary.duplicates_skipped += 1;
            }
            Err(error) => {
                tracing::warn!(booking_id = %booking.id, %error, "case creation failed");
                summary.failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use domain::{
        BookingStatus, CancelledBy, Notification, NotifyError, PaymentError, RefundReceipt,
        StoreError, TimelineEntry, TriggerEvent,
    };
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use uuid::Uuid;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// One in-memory world implementing both stores, so a completed case
    /// can flip its booking the way the real adapter does atomically.
    #[derive(Default)]
    struct MockWorld {
        bookings: RefCell<HashMap<Uuid, BookingRecord>>,
        cases: RefCell<HashMap<Uuid, AutoRefundCase>>,
        stale_issues: RefCell<Vec<UnresponsiveCandidate>>,
        fail_pending_query: Cell<bool>,
    }

    impl MockWorld {
        fn insert_booking(&self, booking: BookingRecord) -> Uuid {
            let id = booking.id;
            self.bookings.borrow_mut().insert(id, booking);
            id
        }

        fn case_for(&self, booking_id: Uuid) -> AutoRefundCase {
            self.cases
                .borrow()
                .values()
                .find(|c| c.booking_id == booking_id)
                .cloned()
                .expect("case should exist")
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

    impl BookingStore for MockWorld {
        async fn fetch_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, StoreError> {
            Ok(self.bookings.borrow().get(&id).cloned())
        }
        async fn pending_without_owner_response(
            &self,
            created_before: DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<BookingRecord>, StoreError> {
            if self.fail_pending_query.get() {
                return Err(StoreError::Unavailable { reason: "query timeout".to_owned() });
            }
            Ok(self
                .bookings
                .borrow()
                .values()
                .filter(|b| b.status == BookingStatus::Pending && b.created_at <= created_before)
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

    impl CaseStore for MockWorld {
        async fn create_if_absent(
            &self,
            case: AutoRefundCase,
        ) -> Result<CaseCreation, StoreError> {
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

    #[derive(Default)]
    struct MockGateway {
        refunds: RefCell<HashMap<String, RefundReceipt>>,
        refund_calls: Cell<u32>,
    }

    impl PaymentGateway for MockGateway {
        async fn refund(
            &self,
            _charge_ref: &str,
            _amount_cents: i64,
            idempotency_key: &str,
        ) -> Result<RefundReceipt, PaymentError> {
            self.refund_calls.set(self.refund_calls.get() + 1);
            let receipt = RefundReceipt {
                external_refund_id: format!("re_{}", self.refunds.borrow().len() + 1),
            };
            self.refunds.borrow_mut().insert(idempotency_key.to_owned(), receipt.clone());
            Ok(receipt)
        }
        async fn lookup(
            &self,
            idempotency_key: &str,
        ) -> Result<Option<RefundReceipt>, PaymentError> {
            Ok(self.refunds.borrow().get(idempotency_key).cloned())
        }
    }

    #[derive(Default)]
    struct MockNotifier {
        sent: RefCell<Vec<Notification>>,
    }

    impl Notifier for MockNotifier {
        async fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
            self.sent.borrow_mut().push(notification);
            Ok(())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn booking(status: BookingStatus, created_ago_hours: i64, starts_in_hours: i64) -> BookingRecord {
        BookingRecord {
            id: Uuid::new_v4(),
            renter_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            gear_title: "Sony A7 IV".to_owned(),
            total_amount_cents: 12_000,
            charge_ref: "ch_monitor".to_owned(),
            status,
            created_at: t0() - Duration::hours(created_ago_hours),
            start_at: t0() + Duration::hours(starts_in_hours),
            cancelled_at: None,
            cancelled_by: None,
            pickup_confirmed: false,
            delivery_confirmed: false,
            refund_amount_cents: None,
            refund_reason: None,
            refund_case_id: None,
        }
    }

    fn monitor() -> TriggerMonitor {
        TriggerMonitor::new(MonitorConfig::builder().build().unwrap(), RuleRegistry::standard())
    }

    #[test]
    fn zero_batch_limit_is_rejected() {
        let error = MonitorConfig::builder().batch_limit(0).build().unwrap_err();
        assert!(matches!(error, MonitorError::InvalidConfig { .. }));
        assert_eq!(MonitorConfig::builder().build().unwrap().batch_limit(), 100);
    }

    // A pending booking 25h old with no owner response gets detected,
    // refunded in full, and the booking flipped to Refunded.
    #[tokio::test]
    async fn silent_owner_produces_automatic_full_refund() {
        let world = MockWorld::default();
        let gateway = MockGateway::default();
        let notifier = MockNotifier::default();
        let booking_id = world.insert_booking(booking(BookingStatus::Pending, 25, 72));

        let summary =
            monitor().run_pass(&world, &world, &gateway, &notifier, &FixedClock(t0())).await;

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.cases_created, 1);
        assert_eq!(summary.auto_processed, 1);
        assert_eq!(summary.failures, 0);

        let case = world.case_for(booking_id);
        assert_eq!(case.status, CaseStatus::Completed);
        assert_eq!(case.trigger.event, TriggerEvent::NoInitialResponse);
        assert_eq!(case.refund_amount_cents, 12_000);
        let refunded = world.bookings.borrow()[&booking_id].clone();
        assert_eq!(refunded.status, BookingStatus::Refunded);
        assert_eq!(refunded.refund_amount_cents, Some(12_000));
        assert_eq!(refunded.refund_case_id, Some(case.id));
    }

    // A booking 23h old is still inside the response window: no case.
    #[tokio::test]
    async fn booking_inside_the_window_is_left_alone() {
        let world = MockWorld::default();
        let gateway = MockGateway::default();
        let notifier = MockNotifier::default();
        world.insert_booking(booking(BookingStatus::Pending, 23, 72));

        let summary =
            monitor().run_pass(&world, &world, &gateway, &notifier, &FixedClock(t0())).await;

        assert_eq!(summary.scanned, 0);
        assert_eq!(summary.cases_created, 0);
        assert!(world.cases.borrow().is_empty());
    }

    #[tokio::test]
    async fn no_show_is_detected_two_hours_past_start() {
        let world = MockWorld::default();
        let gateway = MockGateway::default();
        let notifier = MockNotifier::default();
        // Confirmed, started 3h ago, no handover confirmation.
        let booking_id = world.insert_booking(booking(BookingStatus::Confirmed, 48, -3));

        let summary =
            monitor().run_pass(&world, &world, &gateway, &notifier, &FixedClock(t0())).await;

        assert_eq!(summary.cases_created, 1);
        let case = world.case_for(booking_id);
        assert_eq!(case.trigger.event, TriggerEvent::NoShow);
        assert_eq!(case.status, CaseStatus::Completed);
        assert!(matches!(
            case.detection.evidence,
            TriggerEvidence::NoShow { hours_past_start: 3 }
        ));
    }

    // The review-gated trigger opens a case but never auto-refunds, and a
    // second pass must not open a duplicate.
    #[tokio::test]
    async fn unresponsive_rental_waits_for_review_and_is_idempotent() {
        let world = MockWorld::default();
        let gateway = MockGateway::default();
        let notifier = MockNotifier::default();
        let rental = booking(BookingStatus::Active, 72, -48);
        let booking_id = rental.id;
        world.stale_issues.borrow_mut().push(UnresponsiveCandidate {
            booking: rental.clone(),
            issue_id: Uuid::new_v4(),
            issue_opened_at: t0() - Duration::hours(14),
        });
        world.insert_booking(rental);
        let clock = FixedClock(t0());

        let first = monitor().run_pass(&world, &world, &gateway, &notifier, &clock).await;
        assert_eq!(first.cases_created, 1);
        assert_eq!(first.auto_processed, 0);
        assert_eq!(gateway.refund_calls.get(), 0);

        let case = world.case_for(booking_id);
        assert_eq!(case.status, CaseStatus::Pending);
        assert_eq!(case.refund_amount_cents, 6_000, "half refund per trigger");
        assert_eq!(world.open_cases_requiring_review().await.unwrap().len(), 1);

        let second = monitor().run_pass(&world, &world, &gateway, &notifier, &clock).await;
        assert_eq!(second.cases_created, 0);
        assert_eq!(second.duplicates_skipped, 1);
        assert_eq!(world.cases.borrow().len(), 1);
    }

    #[tokio::test]
    async fn late_owner_cancellation_triggers_full_refund() {
        let world = MockWorld::default();
        let gateway = MockGateway::default();
        let notifier = MockNotifier::default();
        let mut cancelled = booking(BookingStatus::Cancelled, 96, 10);
        cancelled.cancelled_at = Some(t0() - Duration::hours(1));
        cancelled.cancelled_by = Some(CancelledBy::Owner);
        let booking_id = world.insert_booking(cancelled);

        let summary =
            monitor().run_pass(&world, &world, &gateway, &notifier, &FixedClock(t0())).await;

        assert_eq!(summary.cases_created, 1);
        assert_eq!(summary.auto_processed, 1);
        let case = world.case_for(booking_id);
        assert_eq!(case.trigger.event, TriggerEvent::LateCancellationByOwner);
        assert_eq!(case.status, CaseStatus::Completed);
        assert_eq!(case.refund_amount_cents, case.total_amount_cents);
        assert!(matches!(
            case.detection.evidence,
            TriggerEvidence::LateCancellationByOwner { hours_before_start: 11 }
        ));
    }

    // A cancellation exactly 24h before the start is still a late one.
    #[tokio::test]
    async fn cancellation_on_the_window_boundary_still_fires() {
        let world = MockWorld::default();
        let gateway = MockGateway::default();
        let notifier = MockNotifier::default();
        let mut cancelled = booking(BookingStatus::Cancelled, 96, 23);
        cancelled.cancelled_at = Some(t0() - Duration::hours(1));
        cancelled.cancelled_by = Some(CancelledBy::Owner);
        let booking_id = world.insert_booking(cancelled);

        let summary =
            monitor().run_pass(&world, &world, &gateway, &notifier, &FixedClock(t0())).await;

        assert_eq!(summary.cases_created, 1);
        let case = world.case_for(booking_id);
        assert_eq!(case.trigger.event, TriggerEvent::LateCancellationByOwner);
        assert!(matches!(
            case.detection.evidence,
            TriggerEvidence::LateCancellationByOwner { hours_before_start: 24 }
        ));
    }

    // One broken trigger query must not starve the other triggers.
    #[tokio::test]
    async fn failed_trigger_query_does_not_abort_the_pass() {
        let world = MockWorld::default();
        let gateway = MockGateway::default();
        let notifier = MockNotifier::default();
        world.fail_pending_query.set(true);
        world.insert_booking(booking(BookingStatus::Confirmed, 48, -3));

        let summary =
            monitor().run_pass(&world, &world, &gateway, &notifier, &FixedClock(t0())).await;

        assert_eq!(summary.failures, 1);
        assert_eq!(summary.cases_created, 1, "no-show trigger still ran");
    }
}
