// Rust guideline compliant 2026-03-02

//! Per-rule signal evaluators.
//!
//! Each evaluator is a pure function from collected evidence to an optional
//! [`FraudSignal`]: `None` means the rule did not fire. Evidence collection
//! (the async store queries) lives in the analyzer; keeping the evaluators
//! synchronous makes the firing conditions and score formulas trivially
//! testable.

use domain::{FraudSignal, GeoPoint, SignalError, SignalEvidence};
use rules::FraudRule;

/// Booking-velocity rule: fires when `count` reaches the rule threshold.
/// Score grows 25 points per booking, saturating at 100.
pub fn rapid_bookings(
    rule: &FraudRule,
    count: u32,
    window_hours: u32,
) -> Result<Option<FraudSignal>, SignalError> {
    if f64::from(count) < rule.threshold {
        return Ok(None);
    }
    let score = (f64::from(count) * 25.0).min(100.0);
    FraudSignal::new(
        rule.name,
        rule.severity,
        score,
        rule.weight,
        format!("{count} bookings created within {window_hours}h"),
        SignalEvidence::BookingVelocity { count, window_hours },
    )
    .map(Some)
}

/// Payment-failure rule: fires at the threshold count, 30 points per
/// failure.
pub fn payment_failures(
    rule: &FraudRule,
    count: u32,
    window_days: u32,
) -> Result<Option<FraudSignal>, SignalError> {
    if f64::from(count) < rule.threshold {
        return Ok(None);
    }
    let score = (f64::from(count) * 30.0).min(100.0);
    FraudSignal::new(
        rule.name,
        rule.severity,
        score,
        rule.weight,
        format!("{count} failed payment attempts within {window_days}d"),
        SignalEvidence::PaymentFailures { count, window_days },
    )
    .map(Some)
}

/// Geo-mismatch rule: fires when the largest pairwise distance between the
/// sampled booking locations exceeds the threshold. Score scales linearly
/// with the ratio to the threshold (the threshold itself scores 50).
pub fn geo_mismatch(
    rule: &FraudRule,
    locations: &[GeoPoint],
) -> Result<Option<FraudSignal>, SignalError> {
    let mut max_distance_km = 0.0_f64;
    for (i, a) in locations.iter().enumerate() {
        for b in &locations[i + 1..] {
            max_distance_km = max_distance_km.max(a.distance_km(b));
        }
    }
    if max_distance_km <= rule.threshold {
        return Ok(None);
    }
    let score = ((max_distance_km / rule.threshold) * 50.0).min(100.0);
    #[expect(clippy::cast_possible_truncation, reason = "sample count is small")]
    let samples = locations.len() as u32;
    FraudSignal::new(
        rule.name,
        rule.severity,
        score,
        rule.weight,
        format!("booking locations {max_distance_km:.0} km apart"),
        SignalEvidence::GeoMismatch { max_distance_km, samples },
    )
    .map(Some)
}

/// Device-drift rule: fires when distinct fingerprints exceed the
/// threshold, 20 points per device.
pub fn device_drift(
    rule: &FraudRule,
    distinct: u32,
    window_days: u32,
) -> Result<Option<FraudSignal>, SignalError> {
    if f64::from(distinct) <= rule.threshold {
        return Ok(None);
    }
    let score = (f64::from(distinct) * 20.0).min(100.0);
    FraudSignal::new(
        rule.name,
        rule.severity,
        score,
        rule.weight,
        format!("{distinct} distinct devices within {window_days}d"),
        SignalEvidence::DeviceDrift { distinct, window_days },
    )
    .map(Some)
}

/// Message-similarity rule: fires when any pair of recent messages reaches
/// the similarity threshold (normalized Levenshtein). Score is the
/// similarity scaled to 100.
pub fn message_similarity(
    rule: &FraudRule,
    messages: &[String],
) -> Result<Option<FraudSignal>, SignalError> {
    let mut max_similarity = 0.0_f64;
    for (i, a) in messages.iter().enumerate() {
        for b in &messages[i + 1..] {
            max_similarity = max_similarity.max(strsim::normalized_levenshtein(a, b));
        }
    }
    if max_similarity < rule.threshold {
        return Ok(None);
    }
    #[expect(clippy::cast_possible_truncation, reason = "sample count is small")]
    let compared = messages.len() as u32;
    FraudSignal::new(
        rule.name,
        rule.severity,
        max_similarity * 100.0,
        rule.weight,
        format!("near-duplicate messages, similarity {max_similarity:.2}"),
        SignalEvidence::MessageSimilarity { max_similarity, compared },
    )
    .map(Some)
}

/// Payment-method-churn rule: fires at the threshold count, 25 points per
/// method added.
pub fn payment_method_churn(
    rule: &FraudRule,
    added: u32,
    window_hours: u32,
) -> Result<Option<FraudSignal>, SignalError> {
    if f64::from(added) < rule.threshold {
        return Ok(None);
    }
    let score = (f64::from(added) * 25.0).min(100.0);
    FraudSignal::new(
        rule.name,
        rule.severity,
        score,
        rule.weight,
        format!("{added} payment methods added within {window_hours}h"),
        SignalEvidence::PaymentMethodChurn { added, window_hours },
    )
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules::{RuleRegistry, rule_names};

    fn rule(name: &str) -> FraudRule {
        RuleRegistry::standard().fraud_rule(name).unwrap().clone()
    }

    #[test]
    fn rapid_bookings_fires_at_threshold() {
        let rule = rule(rule_names::RAPID_BOOKINGS);
        assert!(rapid_bookings(&rule, 2, 24).unwrap().is_none());
        let signal = rapid_bookings(&rule, 3, 24).unwrap().unwrap();
        assert!((signal.score - 75.0).abs() < f64::EPSILON);
        let saturated = rapid_bookings(&rule, 9, 24).unwrap().unwrap();
        assert!((saturated.score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn payment_failures_fires_at_two() {
        let rule = rule(rule_names::PAYMENT_FAILURES);
        assert!(payment_failures(&rule, 1, 7).unwrap().is_none());
        let signal = payment_failures(&rule, 2, 7).unwrap().unwrap();
        assert!((signal.score - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn geo_mismatch_requires_distance_over_threshold() {
        let rule = rule(rule_names::GEO_MISMATCH);
        // Paris and London are ~344 km apart, under the 500 km threshold.
        let near = vec![
            GeoPoint { lat: 48.8566, lon: 2.3522 },
            GeoPoint { lat: 51.5074, lon: -0.1278 },
        ];
        assert!(geo_mismatch(&rule, &near).unwrap().is_none());
        // Paris and New York are ~5800 km apart.
        let far = vec![
            GeoPoint { lat: 48.8566, lon: 2.3522 },
            GeoPoint { lat: 40.7128, lon: -74.0060 },
        ];
        let signal = geo_mismatch(&rule, &far).unwrap().unwrap();
        assert!((signal.score - 100.0).abs() < f64::EPSILON, "far ratio saturates the score");
        assert!(matches!(
            signal.evidence,
            SignalEvidence::GeoMismatch { max_distance_km, .. } if max_distance_km > 5_000.0
        ));
    }

    #[test]
    fn geo_mismatch_ignores_single_location() {
        let rule = rule(rule_names::GEO_MISMATCH);
        let one = vec![GeoPoint { lat: 48.8566, lon: 2.3522 }];
        assert!(geo_mismatch(&rule, &one).unwrap().is_none());
        assert!(geo_mismatch(&rule, &[]).unwrap().is_none());
    }

    #[test]
    fn device_drift_fires_above_two() {
        let rule = rule(rule_names::DEVICE_DRIFT);
        assert!(device_drift(&rule, 2, 7).unwrap().is_none());
        let signal = device_drift(&rule, 3, 7).unwrap().unwrap();
        assert!((signal.score - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn message_similarity_detects_near_duplicates() {
        let rule = rule(rule_names::MESSAGE_SIMILARITY);
        let distinct = vec![
            "Hi, is the camera still available next weekend?".to_owned(),
            "Could you ship the drone to Lyon?".to_owned(),
        ];
        assert!(message_similarity(&rule, &distinct).unwrap().is_none());

        let scripted = vec![
            "Great deal, contact me at fast-pay.example for a discount!".to_owned(),
            "Great deal, contact me at fast-pay.example for a discount.".to_owned(),
        ];
        let signal = message_similarity(&rule, &scripted).unwrap().unwrap();
        assert!(signal.score >= 90.0);
    }

    #[test]
    fn payment_method_churn_fires_at_three() {
        let rule = rule(rule_names::PAYMENT_METHOD_CHURN);
        assert!(payment_method_churn(&rule, 2, 48).unwrap().is_none());
        let signal = payment_method_churn(&rule, 3, 48).unwrap().unwrap();
        assert!((signal.score - 75.0).abs() < f64::EPSILON);
    }
}
