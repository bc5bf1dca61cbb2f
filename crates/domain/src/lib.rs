// Rust guideline compliant 2026-03-02

//! Shared domain types and hexagonal ports for the risk-scoring and
//! automatic-refund engine.
//!
//! Defines the evidence model (`FraudSignal`, `SignalEvidence`), the scoring
//! verdict (`FraudScore`), the refund-case state machine data
//! (`AutoRefundCase`, `RefundTrigger`, `TimelineEntry`), the booking read
//! model (`BookingRecord`), and the port traits every component depends on:
//! `Clock`, `EvidenceStore`, `BookingStore`, `CaseStore`, `ScoreAudit`,
//! `PaymentGateway`, and `Notifier`. No concrete adapter lives here; all
//! pipeline crates depend on this crate and nothing else in the workspace.

mod booking;
mod case;
mod ports;
mod score;
mod signal;

pub use booking::{BookingRecord, BookingStatus, CancelledBy, GeoPoint};
pub use case::{
    AutoRefundCase, CaseDetection, CaseStatus, RefundOutcome, RefundTrigger, TimelineEntry,
    TriggerEvent, TriggerEvidence,
};
pub use ports::{
    Audience, BookingStore, CaseCreation, CaseStore, Clock, EvidenceStore, NotifyError,
    Notification, Notifier, PaymentError, PaymentGateway, RefundReceipt, ScoreAudit, StoreError,
    UnresponsiveCandidate,
};
pub use score::{FraudActions, FraudScore, RiskLevel, UserType};
pub use signal::{FraudSignal, Severity, SignalError, SignalEvidence};
