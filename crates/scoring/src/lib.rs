// Rust guideline compliant 2026-03-02

//! Risk analysis pipeline: collect evidence, evaluate the rule catalog,
//! aggregate the verdict, audit it.
//!
//! The entry point is [`RiskAnalyzer::analyze`]. Evidence collection is
//! best-effort per rule: a failing store query logs a warning and skips
//! that rule instead of aborting the analysis, so one degraded data source
//! never blanks the whole verdict.

pub mod aggregate;
pub mod evaluate;

use chrono::Duration;
use domain::{Clock, EvidenceStore, FraudScore, FraudSignal, ScoreAudit, SignalError, UserType};
use rules::{RuleRegistry, rule_names};
use uuid::Uuid;

/// Evidence lookback windows, fixed per rule.
const BOOKING_VELOCITY_WINDOW_HOURS: u32 = 24;
const PAYMENT_FAILURE_WINDOW_DAYS: u32 = 7;
const DEVICE_DRIFT_WINDOW_DAYS: u32 = 7;
const PAYMENT_CHURN_WINDOW_HOURS: u32 = 48;
/// Sample sizes for the location and message collectors.
const LOCATION_SAMPLE_LIMIT: usize = 10;
const MESSAGE_SAMPLE_LIMIT: usize = 10;

/// Errors from [`RiskAnalyzer::analyze`].
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// A registry rule produced an invalid signal (broken catalog weight).
    #[error("invalid signal from rule catalog")]
    Signal(#[from] SignalError),
}

/// One analysis request: which booking, which user, which side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub user_type: UserType,
}

/// Evaluates the full rule catalog against one `(booking, user)` pair.
#[derive(Debug, Clone, Default)]
pub struct RiskAnalyzer {
    registry: RuleRegistry,
}

impl RiskAnalyzer {
    #[must_use]
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    /// Run every catalog rule for `request` and return the aggregated
    /// verdict.
    ///
    /// The verdict is recorded through `audit` before returning; an audit
    /// failure is logged and the verdict still returned, the caller's
    /// decision must not hinge on the trail.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Signal`] when the rule catalog itself is
    /// inconsistent (non-positive weight). Store failures never error: the
    /// affected rule is skipped with a warning.
    pub async fn analyze<E, A, C>(
        &self,
        request: AnalyzeRequest,
        evidence: &E,
        audit: &A,
        clock: &C,
    ) -> Result<FraudScore, AnalyzeError>
    where
        E: EvidenceStore,
        A: ScoreAudit,
        C: Clock,
    {
        let now = clock.now();
        let mut signals: Vec<FraudSignal> = Vec::new();
        let user = request.user_id;

        if let Some(rule) = self.registry.fraud_rule(rule_names::RAPID_BOOKINGS) {
            let since = now - Duration::hours(i64::from(BOOKING_VELOCITY_WINDOW_HOURS));
            match evidence.count_recent_bookings(user, since).await {
                Ok(count) => {
                    if let Some(signal) =
                        evaluate::rapid_bookings(rule, count, BOOKING_VELOCITY_WINDOW_HOURS)?
                    {
                        signals.push(signal);
                    }
                }
                Err(error) => {
                    tracing::warn!(rule = rule.name, %error, "evidence collection failed, rule skipped");
                }
            }
        }

        if let Some(rule) = self.registry.fraud_rule(rule_names::PAYMENT_FAILURES) {
            let since = now - Duration::days(i64::from(PAYMENT_FAILURE_WINDOW_DAYS));
            match evidence.count_failed_payments(user, since).await {
                Ok(count) => {
                    if let Some(signal) =
                        evaluate::payment_failures(rule, count, PAYMENT_FAILURE_WINDOW_DAYS)?
                    {
                        signals.push(signal);
                    }
                }
                Err(error) => {
                    tracing::warn!(rule = rule.name, %error, "evidence collection failed, rule skipped");
                }
            }
        }

        if let Some(rule) = self.registry.fraud_rule(rule_names::GEO_MISMATCH) {
            match evidence.booking_locations(user, LOCATION_SAMPLE_LIMIT).await {
                Ok(locations) => {
                    if let Some(signal) = evaluate::geo_mismatch(rule, &locations)? {
                        signals.push(signal);
                    }
                }
                Err(error) => {
                    tracing::warn!(rule = rule.name, %error, "evidence collection failed, rule skipped");
                }
            }
        }

        if let Some(rule) = self.registry.fraud_rule(rule_names::DEVICE_DRIFT) {
            let since = now - Duration::days(i64::from(DEVICE_DRIFT_WINDOW_DAYS));
            match evidence.device_fingerprints(user, since).await {
                Ok(fingerprints) => {
                    #[expect(clippy::cast_possible_truncation, reason = "fingerprint count is small")]
                    let distinct = fingerprints.len() as u32;
                    if let Some(signal) =
                        evaluate::device_drift(rule, distinct, DEVICE_DRIFT_WINDOW_DAYS)?
                    {
                        signals.push(signal);
                    }
                }
                Err(error) => {
                    tracing::warn!(rule = rule.name, %error, "evidence collection failed, rule skipped");
                }
            }
        }

        if let Some(rule) = self.registry.fraud_rule(rule_names::MESSAGE_SIMILARITY) {
            match evidence.recent_messages(user, MESSAGE_SAMPLE_LIMIT).await {
                Ok(messages) => {
                    if let Some(signal) = evaluate::message_similarity(rule, &messages)? {
                        signals.push(signal);
                    }
                }
                Err(error) => {
                    tracing::warn!(rule = rule.name, %error, "evidence collection failed, rule skipped");
                }
            }
        }

        if let Some(rule) = self.registry.fraud_rule(rule_names::PAYMENT_METHOD_CHURN) {
            let since = now - Duration::hours(i64::from(PAYMENT_CHURN_WINDOW_HOURS));
            match evidence.count_payment_methods_added(user, since).await {
                Ok(added) => {
                    if let Some(signal) =
                        evaluate::payment_method_churn(rule, added, PAYMENT_CHURN_WINDOW_HOURS)?
                    {
                        signals.push(signal);
                    }
                }
                Err(error) => {
                    tracing::warn!(rule = rule.name, %error, "evidence collection failed, rule skipped");
                }
            }
        }

        let score = aggregate::aggregate(
            request.booking_id,
            request.user_id,
            request.user_type,
            signals,
            now,
            self.registry.version(),
        );

        tracing::info!(
            booking_id = %score.booking_id,
            user_id = %score.user_id,
            total_score = score.total_score,
            risk_level = ?score.risk_level,
            signal_count = score.signals.len(),
            "risk analysis complete"
        );

        if let Err(error) = audit.record_score(&score).await {
            tracing::warn!(booking_id = %score.booking_id, %error, "score audit write failed");
        }

        Ok(score)
    }
}
