// Rust guideline compliant 2026-03-02

//! Action dispatch: turn scoring verdicts into directives and enqueue the
//! notifications for scoring actions and case outcomes.
//!
//! Notification failures are logged and swallowed everywhere in this
//! module: a dead notification queue must never roll back a refund or block
//! a verdict.

use domain::{AutoRefundCase, CaseStatus, FraudActions, FraudScore, Notification, Notifier};

/// Topic for the renter-facing refund confirmation.
pub const TOPIC_REFUND_COMPLETED: &str = "auto_refund_completed";
/// Topic informing the owner a refund was issued against their booking.
pub const TOPIC_REFUND_ISSUED: &str = "auto_refund_issued_against_owner";
/// Topic for the admin record of a settled automatic refund.
pub const TOPIC_REFUND_SETTLED: &str = "auto_refund_settled";
/// Topic for the admin alert on a failed automatic refund.
pub const TOPIC_REFUND_FAILED: &str = "auto_refund_failed";
/// Topic for the renter-facing rejection notice.
pub const TOPIC_CASE_REJECTED: &str = "auto_refund_rejected";

/// A concrete follow-up the surrounding platform must apply after scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Surface the user on the trust team's flag list.
    FlagUser,
    /// Halt the booking before capture.
    BlockBooking,
    /// Put the transaction in the manual-review queue.
    RequireReview,
}

/// The directives implied by an action set, in application order.
#[must_use]
pub fn directives(actions: &FraudActions) -> Vec<Directive> {
    let mut out = Vec::new();
    if actions.flagged {
        out.push(Directive::FlagUser);
    }
    if actions.blocked {
        out.push(Directive::BlockBooking);
    }
    if actions.requires_review {
        out.push(Directive::RequireReview);
    }
    out
}

/// Enqueue the admin notifications a verdict asks for and return the
/// directives to apply. One notification per topic in the action set.
pub async fn dispatch_score<N: Notifier>(score: &FraudScore, notifier: &N) -> Vec<Directive> {
    for topic in &score.actions.notifications_triggered {
        let body = format!(
            "user {} scored {} ({:?}) on booking {}",
            score.user_id, score.total_score, score.risk_level, score.booking_id
        );
        let notification =
            Notification::admin(topic.clone(), body).about_booking(score.booking_id);
        if let Err(error) = notifier.enqueue(notification).await {
            tracing::warn!(topic = %topic, %error, "score notification failed");
        }
    }
    directives(&score.actions)
}

/// Enqueue the notifications for a settled case.
///
/// `Completed` notifies the renter, the owner, and the admin; `Failed`
/// notifies the admin exactly once; `Cancelled` notifies the renter of the
/// rejection. Open statuses notify nobody.
pub async fn notify_case_outcome<N: Notifier>(case: &AutoRefundCase, notifier: &N) {
    let notifications: Vec<Notification> = match case.status {
        CaseStatus::Completed => vec![
            Notification::user(
                case.renter_id,
                TOPIC_REFUND_COMPLETED,
                format!(
                    "Your refund of {} cents for \"{}\" has been issued.",
                    case.refund_amount_cents, case.gear_title
                ),
            ),
            Notification::user(
                case.owner_id,
                TOPIC_REFUND_ISSUED,
                format!(
                    "A refund was issued to the renter for \"{}\" ({}).",
                    case.gear_title,
                    case.trigger.event.as_str()
                ),
            ),
            Notification::admin(
                TOPIC_REFUND_SETTLED,
                format!(
                    "Automatic refund of {} cents completed for case {} (booking {}).",
                    case.refund_amount_cents, case.id, case.booking_id
                ),
            ),
        ],
        CaseStatus::Failed => vec![Notification::admin(
            TOPIC_REFUND_FAILED,
            format!(
                "Automatic refund failed for case {} (booking {}): {}",
                case.id,
                case.booking_id,
                case.refund.failure_reason.as_deref().unwrap_or("unknown")
            ),
        )],
        CaseStatus::Cancelled => vec![Notification::user(
            case.renter_id,
            TOPIC_CASE_REJECTED,
            format!("Your automatic refund request for \"{}\" was declined.", case.gear_title),
        )],
        CaseStatus::Pending | CaseStatus::Processing => vec![],
    };

    for notification in notifications {
        let notification = notification.about_booking(case.booking_id).about_case(case.id);
        if let Err(error) = notifier.enqueue(notification).await {
            tracing::warn!(case_id = %case.id, %error, "case notification failed");
        }
    }
}
