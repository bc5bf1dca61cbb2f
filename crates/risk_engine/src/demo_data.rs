// Rust guideline compliant 2026-03-02

//! Deterministic demo dataset for the risk-engine binaries.
//!
//! Builds a small marketplace snapshot: one clean renter, one renter with a
//! heavy fraud footprint, and one booking per refund trigger. Amounts and
//! gear are drawn from a seeded RNG so repeated runs tell the same story.

use crate::adapters::memory_store::MemoryStore;
use chrono::{DateTime, Duration, Utc};
use domain::{BookingRecord, BookingStatus, CancelledBy, GeoPoint, UnresponsiveCandidate};
use rand::rngs::StdRng;
use rand::Rng as _;
use uuid::Uuid;

const GEAR_TITLES: [&str; 8] = [
    "Canon EOS R5",
    "DJI Mavic 4 Pro",
    "Sony A7 IV",
    "GoPro Hero 13",
    "Petzl climbing kit",
    "MSR Hubba Hubba tent",
    "Yamaha stage piano",
    "Trek Fuel EX 9.8",
];

/// The generated snapshot, with the ids the demo run reports on.
#[derive(Debug)]
pub struct DemoWorld {
    pub clean_renter: Uuid,
    pub risky_renter: Uuid,
    /// Booking used for the two scoring calls.
    pub scored_booking: Uuid,
    pub bookings: Vec<BookingRecord>,
    pub stale_issue: UnresponsiveCandidate,
    failed_payment_times: Vec<DateTime<Utc>>,
    locations: Vec<GeoPoint>,
    devices: Vec<(String, DateTime<Utc>)>,
    messages: Vec<String>,
    payment_method_times: Vec<DateTime<Utc>>,
}

impl DemoWorld {
    /// Generate the snapshot relative to `now`.
    #[must_use]
    pub fn generate(rng: &mut StdRng, now: DateTime<Utc>) -> Self {
        let clean_renter = Uuid::new_v4();
        let risky_renter = Uuid::new_v4();
        let mut bookings = Vec::new();

        let mut make_booking = |rng: &mut StdRng,
                                renter: Uuid,
                                status: BookingStatus,
                                created_ago_hours: i64,
                                starts_in_hours: i64| {
            BookingRecord {
                id: Uuid::new_v4(),
                renter_id: renter,
                owner_id: Uuid::new_v4(),
                gear_title: GEAR_TITLES[rng.random_range(0..GEAR_TITLES.len())].to_owned(),
                total_amount_cents: i64::from(rng.random_range(40..400_u32)) * 100,
                charge_ref: format!("ch_demo_{}", rng.random_range(10_000..100_000_u32)),
                status,
                created_at: now - Duration::hours(created_ago_hours),
                start_at: now + Duration::hours(starts_in_hours),
                cancelled_at: None,
                cancelled_by: None,
                pickup_confirmed: false,
                delivery_confirmed: false,
                refund_amount_cents: None,
                refund_reason: None,
                refund_case_id: None,
            }
        };

        // Booking both renters are scored against; well inside all windows.
        let scored = make_booking(rng, risky_renter, BookingStatus::Pending, 1, 96);
        let scored_booking = scored.id;
        bookings.push(scored);

        // Velocity evidence: three more bookings by the risky renter today.
        for _ in 0..3 {
            bookings.push(make_booking(rng, risky_renter, BookingStatus::Pending, 6, 120));
        }

        // Trigger 1: pending for 26h, owner silent.
        bookings.push(make_booking(rng, clean_renter, BookingStatus::Pending, 26, 96));

        // Trigger 2: confirmed, started 3h ago, nothing handed over.
        bookings.push(make_booking(rng, clean_renter, BookingStatus::Confirmed, 48, -3));

        // Trigger 3: active rental with a 14h-old unanswered issue.
        let rental = make_booking(rng, clean_renter, BookingStatus::Active, 96, -48);
        let stale_issue = UnresponsiveCandidate {
            booking: rental.clone(),
            issue_id: Uuid::new_v4(),
            issue_opened_at: now - Duration::hours(14),
        };
        bookings.push(rental);

        // Trigger 4: owner cancelled 10h before the start.
        let mut cancelled = make_booking(rng, clean_renter, BookingStatus::Cancelled, 72, 10);
        cancelled.cancelled_at = Some(now - Duration::hours(1));
        cancelled.cancelled_by = Some(CancelledBy::Owner);
        bookings.push(cancelled);

        Self {
            clean_renter,
            risky_renter,
            scored_booking,
            bookings,
            stale_issue,
            failed_payment_times: vec![
                now - Duration::days(1),
                now - Duration::days(2),
                now - Duration::days(4),
            ],
            locations: vec![
                // Paris, then New York: far past the geo threshold.
                GeoPoint { lat: 48.8566, lon: 2.3522 },
                GeoPoint { lat: 40.7128, lon: -74.0060 },
            ],
            devices: vec![
                ("fp_chrome_linux".to_owned(), now - Duration::days(1)),
                ("fp_safari_ios".to_owned(), now - Duration::days(2)),
                ("fp_firefox_win".to_owned(), now - Duration::days(3)),
            ],
            messages: vec![
                "Great gear, pay me off-platform for a 20% discount!".to_owned(),
                "Great gear, pay me off-platform for a 20% discount.".to_owned(),
            ],
            payment_method_times: vec![
                now - Duration::hours(2),
                now - Duration::hours(12),
                now - Duration::hours(30),
            ],
        }
    }

    /// Load the full snapshot, bookings and evidence, into a `MemoryStore`.
    pub fn apply_bookings(&self, store: &MemoryStore) {
        for booking in &self.bookings {
            store.insert_booking(booking.clone());
        }
        store.add_stale_issue(self.stale_issue.clone());
    }

    /// Load the risky renter's fraud footprint into a `MemoryStore`.
    pub fn apply_evidence(&self, store: &MemoryStore) {
        for at in &self.failed_payment_times {
            store.add_failed_payment(self.risky_renter, *at);
        }
        for location in &self.locations {
            store.add_booking_location(self.risky_renter, *location);
        }
        for (fingerprint, at) in &self.devices {
            store.add_device(self.risky_renter, fingerprint.clone(), *at);
        }
        for message in &self.messages {
            store.add_message(self.risky_renter, message.clone());
        }
        for at in &self.payment_method_times {
            store.add_payment_method(self.risky_renter, *at);
        }
    }
}
