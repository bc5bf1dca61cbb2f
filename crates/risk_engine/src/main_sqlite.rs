// Rust guideline compliant 2026-03-02

//! Risk-engine entry point -- `SQLite` persistence demo.
//!
//! Identical to the main `risk_engine` binary except that bookings, refund
//! cases, and the score audit trail live in a SQLite file
//! (`risk_engine.db` in the current working directory). This demonstrates
//! that the hexagonal store ports are truly swappable: only this entry
//! point and the adapter change; the scoring and refund crates are
//! untouched. Behavioral evidence (payments, devices, messages) stays on
//! the in-memory adapter.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info cargo run --bin risk_engine_sqlite
//! ```
//!
//! The file `risk_engine.db` is created on first run. Inspect rows with
//! any `SQLite` browser.

mod adapters;
mod demo_data;

// Load sqlite_store directly so it only enters this binary's module tree,
// avoiding dead_code warnings in the `risk_engine` binary (which uses
// MemoryStore instead).
#[path = "adapters/sqlite_store.rs"]
mod sqlite_store;

use adapters::demo_gateway::DemoGateway;
use adapters::log_notifier::LogNotifier;
use adapters::memory_store::MemoryStore;
use adapters::system_clock::SystemClock;
use anyhow::Context as _;
use demo_data::DemoWorld;
use domain::{CaseStore as _, Clock as _, UserType};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use refunds::dispatch;
use refunds::{CaseManager, MonitorConfig, TriggerMonitor};
use rules::RuleRegistry;
use scoring::{AnalyzeRequest, RiskAnalyzer};
use sqlite_store::SqliteStore;

/// Database file created in the current working directory on first run.
///
/// Using the current working directory is acceptable for a demo adapter.
/// A production adapter would read this from configuration or environment.
const DB_URL: &str = "sqlite:risk_engine.db";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize the tracing subscriber before any async work.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let clock = SystemClock::new();
    let store = SqliteStore::new(DB_URL).await.context("failed to open SQLite store")?;
    let evidence = MemoryStore::new();
    let gateway = DemoGateway::new();
    let notifier = LogNotifier::new();

    // Fixed seed: repeated runs tell the same story.
    let mut rng = StdRng::seed_from_u64(42);
    let world = DemoWorld::generate(&mut rng, clock.now());
    for booking in &world.bookings {
        store.insert_booking(booking).await.context("failed to seed booking")?;
    }
    store
        .insert_issue(
            world.stale_issue.issue_id,
            world.stale_issue.booking.id,
            world.stale_issue.issue_opened_at,
        )
        .await
        .context("failed to seed issue")?;
    world.apply_evidence(&evidence);

    // -- Scoring: clean renter vs. risky renter on the same booking --
    let analyzer = RiskAnalyzer::new(RuleRegistry::standard());
    for (label, user_id) in [("clean", world.clean_renter), ("risky", world.risky_renter)] {
        let request = AnalyzeRequest {
            booking_id: world.scored_booking,
            user_id,
            user_type: UserType::Renter,
        };
        let score = analyzer
            .analyze(request, &evidence, &store, &clock)
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
        refunds_settled = gateway.settled_count(),
        scores_audited = store.score_count().await?,
        "demo run complete"
    );

    Ok(())
}
