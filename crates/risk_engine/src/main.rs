// Rust guideline compliant 2026-03-02

//! Risk-engine entry point -- in-memory demo.
//!
//! Wires the scoring pipeline and the refund trigger monitor to the
//! in-memory adapters, seeds a small marketplace snapshot, scores a clean
//! and a risky renter, runs one monitor pass, and settles the manual-review
//! queue.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info cargo run --bin risk_engine
//!
//! # Also show per-rule debug output
//! RUST_LOG=debug cargo run --bin risk_engine
//! ```

mod adapters;
mod demo_data;

use adapters::demo_gateway::DemoGateway;
use adapters::log_notifier::LogNotifier;
use adapters::memory_store::MemoryStore;
use adapters::system_clock::SystemClock;
use anyhow::Context as _;
use demo_data::DemoWorld;
use domain::{CaseStore as _, Clock as _, UserType};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use refunds::{CaseManager, MonitorConfig, TriggerMonitor};
use refunds::dispatch;
use rules::RuleRegistry;
use scoring::{AnalyzeRequest, RiskAnalyzer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize the tracing subscriber before any async work.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let clock = SystemClock::new();
    let store = MemoryStore::new();
    let gateway = DemoGateway::new();
    let notifier = LogNotifier::new();

    // Fixed seed: repeated runs tell the same story.
    let mut rng = StdRng::seed_from_u64(42);
    let world = DemoWorld::generate(&mut rng, clock.now());
    world.apply_bookings(&store);
    world.apply_evidence(&store);

    // -- Scoring: clean renter vs. risky renter on the same booking --
    let analyzer = RiskAnalyzer::new(RuleRegistry::standard());
    for (label, user_id) in [("clean", world.clean_renter), ("risky", world.risky_renter)] {
        let request = AnalyzeRequest {
            booking_id: world.scored_booking,
            user_id,
            user_type: UserType::Renter,
        };
        let score = analyzer
            .analyze(request, &store, &store, &clock)
            .await
            .context("risk analysis failed")?;
        let directives = dispatch::dispatch_score(&score, &notifier).await;
        tracing::info!(
            renter = label,
            total_score = score.total_score,
            risk_level = ?score.risk_level,
            confidence = score.confidence,
            directives = ?directives,
            "verdict"
        );
    }

    // -- Refund triggers: one monitor pass over the seeded bookings --
    let monitor_config = MonitorConfig::builder()
        .batch_limit(100)
        .build()
        .context("failed to build monitor config")?;
    let monitor = TriggerMonitor::new(monitor_config, RuleRegistry::standard());
    let summary = monitor.run_pass(&store, &store, &gateway, &notifier, &clock).await;
    tracing::info!(
        scanned = summary.scanned,
        cases_created = summary.cases_created,
        auto_processed = summary.auto_processed,
        failures = summary.failures,
        "monitor pass"
    );

    // -- Manual review: approve everything the monitor left pending --
    let manager = CaseManager;
    for case in store.open_cases_requiring_review().await? {
        let settled = manager
            .approve(case.id, "admin:demo", &store, &gateway, &notifier, &clock)
            .await
            .context("manual approval failed")?;
        tracing::info!(
            case_id = %settled.id,
            status = %settled.status,
            refund_cents = settled.refund_amount_cents,
            "review queue settled"
        );
    }

    tracing::info!(
        total_cases = store.case_count(),
        refunds_settled = gateway.settled_count(),
        scores_audited = store.audited_scores().len(),
        "demo run complete"
    );

    Ok(())
}
