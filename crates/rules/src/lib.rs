// Rust guideline compliant 2026-03-02

//! Rule catalog: the static configuration of fraud rules and refund
//! triggers.
//!
//! Scoring and refund processing never hard-code thresholds or weights;
//! they look everything up in a [`RuleRegistry`]. `RuleRegistry::standard`
//! is the production catalog; tests build narrower registries where needed.

use domain::{RefundTrigger, Severity, TriggerEvent};

/// Canonical rule names, shared between the registry, evaluators, and tests.
pub mod rule_names {
    pub const RAPID_BOOKINGS: &str = "rapid_bookings";
    pub const PAYMENT_FAILURES: &str = "payment_failures";
    pub const GEO_MISMATCH: &str = "geo_mismatch";
    pub const DEVICE_DRIFT: &str = "device_drift";
    pub const MESSAGE_SIMILARITY: &str = "message_similarity";
    pub const PAYMENT_METHOD_CHURN: &str = "payment_method_churn";
}

/// Static configuration of one fraud rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudRule {
    /// Stable name, key into the registry.
    pub name: &'static str,
    /// Aggregation weight, `> 0`.
    pub weight: f64,
    /// Severity stamped on signals this rule emits.
    pub severity: Severity,
    /// Firing threshold; unit depends on the rule (count, km, similarity).
    pub threshold: f64,
    pub description: &'static str,
}

/// Versioned catalog of fraud rules and refund triggers.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    version: &'static str,
    rules: Vec<FraudRule>,
    triggers: Vec<RefundTrigger>,
}

impl RuleRegistry {
    /// The production catalog: six fraud rules, four refund triggers.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            version: "rules-v1",
            rules: vec![
                FraudRule {
                    name: rule_names::RAPID_BOOKINGS,
                    weight: 0.8,
                    severity: Severity::High,
                    threshold: 3.0,
                    description: "Unusually many bookings created within 24 hours",
                },
                FraudRule {
                    name: rule_names::PAYMENT_FAILURES,
                    weight: 0.9,
                    severity: Severity::High,
                    threshold: 2.0,
                    description: "Repeated failed payment attempts within 7 days",
                },
                FraudRule {
                    name: rule_names::GEO_MISMATCH,
                    weight: 0.6,
                    severity: Severity::Medium,
                    threshold: 500.0,
                    description: "Recent bookings placed from locations over 500 km apart",
                },
                FraudRule {
                    name: rule_names::DEVICE_DRIFT,
                    weight: 0.5,
                    severity: Severity::Medium,
                    threshold: 2.0,
                    description: "More than two distinct devices within 7 days",
                },
                FraudRule {
                    name: rule_names::MESSAGE_SIMILARITY,
                    weight: 0.4,
                    severity: Severity::Medium,
                    threshold: 0.9,
                    description: "Near-duplicate outbound messages (copy-paste scripting)",
                },
                FraudRule {
                    name: rule_names::PAYMENT_METHOD_CHURN,
                    weight: 0.7,
                    severity: Severity::High,
                    threshold: 3.0,
                    description: "Three or more payment methods added within 48 hours",
                },
            ],
            triggers: vec![
                RefundTrigger {
                    event: TriggerEvent::NoInitialResponse,
                    description: "Owner did not respond within 24 hours of the booking request"
                        .to_owned(),
                    timeout_hours: 24,
                    refund_percentage: 1.0,
                    requires_manual_review: false,
                },
                RefundTrigger {
                    event: TriggerEvent::NoShow,
                    description: "Owner did not hand over the gear within 2 hours of the start"
                        .to_owned(),
                    timeout_hours: 2,
                    refund_percentage: 1.0,
                    requires_manual_review: false,
                },
                RefundTrigger {
                    event: TriggerEvent::UnresponsiveDuringRental,
                    description: "Owner silent for 12 hours on an open high-priority issue"
                        .to_owned(),
                    timeout_hours: 12,
                    refund_percentage: 0.5,
                    requires_manual_review: true,
                },
                RefundTrigger {
                    event: TriggerEvent::LateCancellationByOwner,
                    description: "Owner cancelled less than 24 hours before the rental start"
                        .to_owned(),
                    timeout_hours: 24,
                    refund_percentage: 1.0,
                    requires_manual_review: false,
                },
            ],
        }
    }

    /// Registry version, stamped on every `FraudScore` as `model_version`.
    #[must_use]
    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Look up a fraud rule by name.
    #[must_use]
    pub fn fraud_rule(&self, name: &str) -> Option<&FraudRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// All fraud rules, in catalog order.
    #[must_use]
    pub fn fraud_rules(&self) -> &[FraudRule] {
        &self.rules
    }

    /// The trigger configuration for `event`. Total over [`TriggerEvent`]:
    /// every event has exactly one entry in the standard catalog.
    #[must_use]
    pub fn refund_trigger(&self, event: TriggerEvent) -> Option<&RefundTrigger> {
        self.triggers.iter().find(|t| t.event == event)
    }

    /// All refund triggers, in catalog order.
    #[must_use]
    pub fn refund_triggers(&self) -> &[RefundTrigger] {
        &self.triggers
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
