// Rust guideline compliant 2026-03-02

//! Booking read model consumed by the trigger monitor and signal collectors.
//!
//! The booking CRUD workflow itself lives outside this engine; these types
//! are the snapshot the persistence collaborator hands back from its
//! status/time-window queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a booking as the engine observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    Refunded,
}

/// Which party cancelled a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Renter,
    Owner,
}

/// Snapshot of one booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    /// Title of the listed gear, denormalized for case display.
    pub gear_title: String,
    /// Total booking price in integer cents.
    pub total_amount_cents: i64,
    /// Reference of the captured charge at the payment collaborator.
    pub charge_ref: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    /// Scheduled rental start.
    pub start_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<CancelledBy>,
    /// Pickup confirmed by either party.
    pub pickup_confirmed: bool,
    /// Delivery confirmed by either party.
    pub delivery_confirmed: bool,
    /// Set when the booking is flipped to `Refunded` by a completed case.
    pub refund_amount_cents: Option<i64>,
    pub refund_reason: Option<String>,
    pub refund_case_id: Option<Uuid>,
}

/// A geographic point attached to a booking (collector evidence).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Great-circle distance to `other` in kilometres (haversine).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}
