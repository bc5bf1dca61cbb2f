// Rust guideline compliant 2026-03-02

//! Scoring verdict: `FraudScore` with its risk level and action set.

use crate::signal::FraudSignal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the rental the scored user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Renter,
    Owner,
}

/// Coarse classification derived from the aggregated score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a total score. Boundaries are exact:
    /// `>= 80` Critical, `>= 60` High, `>= 30` Medium, else Low.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Critical,
            60..=79 => Self::High,
            30..=59 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Directive flags derived from a score, plus the notification targets they
/// triggered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FraudActions {
    /// Surface the transaction to the trust team.
    pub flagged: bool,
    /// Stop the booking before money moves.
    pub blocked: bool,
    /// Queue for a human decision.
    pub requires_review: bool,
    /// Notification topics enqueued alongside the flags.
    pub notifications_triggered: Vec<String>,
}

impl FraudActions {
    /// The empty action set (low risk).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// The verdict for one `(booking, user)` pair.
///
/// Created once per analysis call, persisted as an audit record through the
/// `ScoreAudit` port, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudScore {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub user_type: UserType,
    /// The signals the verdict was aggregated from.
    pub signals: Vec<FraudSignal>,
    /// Weighted mean of signal scores, rounded and clamped into `[0, 100]`.
    pub total_score: u8,
    pub risk_level: RiskLevel,
    /// Confidence in the verdict, `[0, 1]`; exactly `0.5` with no signals.
    pub confidence: f64,
    pub actions: FraudActions,
    pub analyzed_at: DateTime<Utc>,
    /// Version of the rule registry that produced this verdict.
    pub model_version: String,
}
