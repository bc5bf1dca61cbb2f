// Rust guideline compliant 2026-03-02

//! Evidence model: one `FraudSignal` per triggered fraud rule.

use serde::{Deserialize, Serialize};

/// Severity assigned to a signal by its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// `true` for `High` and `Critical` -- the severities that raise
    /// aggregate confidence.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// Rule-specific evidence payload carried by a [`FraudSignal`].
///
/// One variant per fraud rule, so evaluators and tests can pattern-match
/// exhaustively instead of digging through a free-form map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalEvidence {
    /// Bookings created by the user inside the velocity window.
    BookingVelocity { count: u32, window_hours: u32 },
    /// Failed payment attempts inside the lookback window.
    PaymentFailures { count: u32, window_days: u32 },
    /// Largest pairwise distance between recent booking locations.
    GeoMismatch { max_distance_km: f64, samples: u32 },
    /// Distinct device fingerprints observed inside the window.
    DeviceDrift { distinct: u32, window_days: u32 },
    /// Highest normalized similarity between recent outbound messages.
    MessageSimilarity { max_similarity: f64, compared: u32 },
    /// Payment methods added inside the churn window.
    PaymentMethodChurn { added: u32, window_hours: u32 },
}

/// Errors from [`FraudSignal`] construction.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Weights multiply into the aggregate denominator and must be positive.
    #[error("signal weight must be positive, got {weight}")]
    InvalidWeight {
        /// The rejected weight value.
        weight: f64,
    },
}

/// One piece of weighted evidence that a transaction may be fraudulent.
///
/// Immutable once created; owned by the evaluation call that produced it.
/// Construct via [`FraudSignal::new`], which clamps `score` into `[0, 100]`
/// and rejects non-positive weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudSignal {
    /// Rule name -- key into the rule registry.
    pub rule: String,
    /// Severity assigned by the rule.
    pub severity: Severity,
    /// Raw signal score in `[0, 100]`.
    pub score: f64,
    /// Rule-defined aggregation weight, `> 0`.
    pub weight: f64,
    /// Human-readable summary of what fired.
    pub description: String,
    /// Structured, rule-specific evidence.
    pub evidence: SignalEvidence,
}

impl FraudSignal {
    /// Create a signal, clamping `score` into `[0, 100]`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidWeight`] when `weight <= 0` (or is NaN).
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        score: f64,
        weight: f64,
        description: impl Into<String>,
        evidence: SignalEvidence,
    ) -> Result<Self, SignalError> {
        if weight.is_nan() || weight <= 0.0 {
            return Err(SignalError::InvalidWeight { weight });
        }
        Ok(Self {
            rule: rule.into(),
            severity,
            score: score.clamp(0.0, 100.0),
            weight,
            description: description.into(),
            evidence,
        })
    }
}
