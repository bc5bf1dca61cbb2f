// Rust guideline compliant 2026-03-02

//! Automatic-refund case: trigger configuration, state machine data, and
//! the append-only timeline that serves as the canonical audit log.

use crate::booking::BookingRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A detected real-world condition that warrants an automatic refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Owner never responded to a pending booking request.
    NoInitialResponse,
    /// Confirmed booking started but neither pickup nor delivery happened.
    NoShow,
    /// Owner went silent on an open high/urgent issue during the rental.
    UnresponsiveDuringRental,
    /// Owner cancelled inside the late-cancellation window before start.
    LateCancellationByOwner,
}

impl TriggerEvent {
    /// All trigger events, in monitor scan order.
    pub const ALL: [Self; 4] = [
        Self::NoInitialResponse,
        Self::NoShow,
        Self::UnresponsiveDuringRental,
        Self::LateCancellationByOwner,
    ];

    /// Stable string key used in persistence and notifications.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoInitialResponse => "no_initial_response",
            Self::NoShow => "no_show",
            Self::UnresponsiveDuringRental => "unresponsive_during_rental",
            Self::LateCancellationByOwner => "late_cancellation_by_owner",
        }
    }
}

/// Static refund-trigger configuration, owned by the rule registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundTrigger {
    pub event: TriggerEvent,
    pub description: String,
    /// Detection window / response deadline in hours.
    pub timeout_hours: u32,
    /// Fraction of the booking total to refund, `[0, 1]`.
    pub refund_percentage: f64,
    /// When `true`, cases stay `Pending` until an admin decides.
    pub requires_manual_review: bool,
}

impl RefundTrigger {
    /// `round(total x percentage)`, clamped into `[0, total]`.
    #[must_use]
    pub fn refund_amount_cents(&self, total_amount_cents: i64) -> i64 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "product of a cents amount and a percentage in [0,1] fits i64"
        )]
        let raw = (total_amount_cents as f64 * self.refund_percentage).round() as i64;
        raw.clamp(0, total_amount_cents)
    }
}

/// Case lifecycle status.
///
/// `Pending -> Processing -> {Completed | Failed}`; `Pending -> Cancelled`;
/// `Failed -> Processing` only through an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl CaseStatus {
    /// Stable string key used in persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// A case counts as open while it may still produce a refund attempt
    /// without an explicit re-drive. `Failed` is not open; it needs an
    /// explicit retry.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the append-only case timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    /// Short machine-readable event key, e.g. `processing_started`.
    pub event: String,
    pub description: String,
    /// Acting party for manual transitions; `None` for automatic ones.
    pub actor: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TimelineEntry {
    /// Create an automatic (actor-less) entry.
    #[must_use]
    pub fn new(at: DateTime<Utc>, event: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            at,
            event: event.into(),
            description: description.into(),
            actor: None,
            metadata: None,
        }
    }

    /// Attach the acting party.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Attach structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Trigger-specific evidence captured at detection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerEvidence {
    NoInitialResponse { booking_age_hours: i64 },
    NoShow { hours_past_start: i64 },
    UnresponsiveDuringRental { issue_id: Uuid, unresolved_hours: i64 },
    LateCancellationByOwner { hours_before_start: i64 },
}

/// Detection block -- fixed at creation, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDetection {
    pub detected_at: DateTime<Utc>,
    pub trigger_event: TriggerEvent,
    /// Deadline after which the case is considered stale for review.
    pub response_deadline: DateTime<Utc>,
    pub evidence: TriggerEvidence,
}

/// Refund execution record -- mutated only while `Processing`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub initiated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    /// Refund reference at the payment collaborator.
    pub external_refund_id: Option<String>,
    pub failure_reason: Option<String>,
}

/// The tracked unit of work from trigger detection through refund
/// completion or failure.
///
/// The case manager exclusively owns writes to `status` and `refund`; the
/// booking record is updated only as the side effect of a completed refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoRefundCase {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub gear_title: String,
    /// Reference of the captured charge, denormalized from the booking so
    /// refund execution needs no extra read.
    pub charge_ref: String,
    pub total_amount_cents: i64,
    /// `round(total x trigger.refund_percentage)`, always `<= total`.
    pub refund_amount_cents: i64,
    pub trigger: RefundTrigger,
    pub status: CaseStatus,
    /// Append-only audit log; never rewritten.
    pub timeline: Vec<TimelineEntry>,
    pub detection: CaseDetection,
    pub refund: RefundOutcome,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutoRefundCase {
    /// Build a fresh `Pending` case from a detected trigger condition.
    ///
    /// Computes the refund amount, fixes the detection block, and records
    /// the initial `trigger_detected` timeline entry.
    #[must_use]
    pub fn detect(
        booking: &BookingRecord,
        trigger: RefundTrigger,
        evidence: TriggerEvidence,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let refund_amount_cents = trigger.refund_amount_cents(booking.total_amount_cents);
        let response_deadline = detected_at + Duration::hours(i64::from(trigger.timeout_hours));
        let initial = TimelineEntry::new(
            detected_at,
            "trigger_detected",
            format!("detected {} for booking {}", trigger.event.as_str(), booking.id),
        );
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            renter_id: booking.renter_id,
            owner_id: booking.owner_id,
            gear_title: booking.gear_title.clone(),
            charge_ref: booking.charge_ref.clone(),
            total_amount_cents: booking.total_amount_cents,
            refund_amount_cents,
            detection: CaseDetection {
                detected_at,
                trigger_event: trigger.event,
                response_deadline,
                evidence,
            },
            trigger,
            status: CaseStatus::Pending,
            timeline: vec![initial],
            refund: RefundOutcome::default(),
            created_at: detected_at,
            updated_at: detected_at,
        }
    }

    /// Append a timeline entry and bump `updated_at`.
    pub fn record(&mut self, entry: TimelineEntry) {
        self.updated_at = entry.at;
        self.timeline.push(entry);
    }
}
