// Rust guideline compliant 2026-03-02

//! Signal aggregation: weighted total score, confidence, and the action set
//! derived from the risk level.

use chrono::{DateTime, Utc};
use domain::{FraudActions, FraudScore, FraudSignal, RiskLevel, UserType};
use uuid::Uuid;

/// Notification topic for a flagged (medium-risk) transaction.
pub const TOPIC_FRAUD_FLAG: &str = "admin_fraud_flag";
/// Notification topic for a high-risk transaction queued for review.
pub const TOPIC_MANUAL_REVIEW: &str = "admin_manual_review";
/// Notification topic for a blocked critical-risk transaction.
pub const TOPIC_CRITICAL_FRAUD: &str = "admin_critical_fraud";

/// Weighted mean of signal scores, rounded and clamped into `[0, 100]`.
/// No signals means zero.
#[must_use]
pub fn total_score(signals: &[FraudSignal]) -> u8 {
    let weight_sum: f64 = signals.iter().map(|s| s.weight).sum();
    if weight_sum <= 0.0 {
        return 0;
    }
    let weighted: f64 = signals.iter().map(|s| s.score * s.weight).sum();
    let clamped = (weighted / weight_sum).round().clamp(0.0, 100.0);
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "clamped into [0, 100] before the cast"
    )]
    let total = clamped as u8;
    total
}

/// Confidence in the verdict.
///
/// With no signals the engine had nothing to weigh either way: exactly
/// `0.5`. Otherwise a `0.3` base plus `0.7` scaled by the share of
/// elevated-severity signals, capped at `1.0`.
#[must_use]
pub fn confidence(signals: &[FraudSignal]) -> f64 {
    if signals.is_empty() {
        return 0.5;
    }
    let elevated = signals.iter().filter(|s| s.severity.is_elevated()).count();
    #[expect(clippy::cast_precision_loss, reason = "signal counts are tiny")]
    let share = elevated as f64 / signals.len() as f64;
    (0.3 + 0.7 * share).min(1.0)
}

/// The action set for a risk level. Tiers are cumulative in spirit but each
/// level enqueues exactly one admin notification topic.
#[must_use]
pub fn actions_for(level: RiskLevel) -> FraudActions {
    match level {
        RiskLevel::Low => FraudActions::none(),
        RiskLevel::Medium => FraudActions {
            flagged: true,
            blocked: false,
            requires_review: false,
            notifications_triggered: vec![TOPIC_FRAUD_FLAG.to_owned()],
        },
        RiskLevel::High => FraudActions {
            flagged: true,
            blocked: false,
            requires_review: true,
            notifications_triggered: vec![TOPIC_MANUAL_REVIEW.to_owned()],
        },
        RiskLevel::Critical => FraudActions {
            flagged: true,
            blocked: true,
            requires_review: true,
            notifications_triggered: vec![TOPIC_CRITICAL_FRAUD.to_owned()],
        },
    }
}

/// Assemble the immutable verdict from the fired signals.
#[must_use]
pub fn aggregate(
    booking_id: Uuid,
    user_id: Uuid,
    user_type: UserType,
    signals: Vec<FraudSignal>,
    analyzed_at: DateTime<Utc>,
    model_version: &str,
) -> FraudScore {
    let total = total_score(&signals);
    let risk_level = RiskLevel::from_score(total);
    let confidence = confidence(&signals);
    FraudScore {
        booking_id,
        user_id,
        user_type,
        total_score: total,
        risk_level,
        confidence,
        actions: actions_for(risk_level),
        signals,
        analyzed_at,
        model_version: model_version.to_owned(),
    }
}
