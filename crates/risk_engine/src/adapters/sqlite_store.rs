// Rust guideline compliant 2026-03-02

//! SQLite adapter for the `BookingStore`, `CaseStore`, and `ScoreAudit`
//! ports via `sqlx`.
//!
//! Proves that the hexagonal store ports are truly swappable without
//! touching the scoring or refund pipeline crates.
//!
//! # Schema notes
//!
//! Timestamps are stored as unix milliseconds (INTEGER) so window
//! comparisons stay plain integer comparisons. Case and score payloads are
//! stored as JSON documents next to the columns the queries filter on; the
//! JSON is the source of truth for everything the queries do not index.
//!
//! The one-open-case-per-`(booking, trigger)` invariant is enforced by a
//! partial unique index, so concurrent detection passes race on the
//! constraint instead of on a check-then-write.

use chrono::{DateTime, TimeZone as _, Utc};
use domain::{
    AutoRefundCase, BookingRecord, BookingStatus, BookingStore, CancelledBy, CaseCreation,
    CaseStatus, CaseStore, FraudScore, ScoreAudit, StoreError, TimelineEntry,
    UnresponsiveCandidate,
};
use sqlx::Row as _;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

/// Store adapter backed by a SQLite database via `sqlx`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| StoreError::Unavailable {
        reason: format!("invalid stored timestamp {ms}"),
    })
}

fn store_err(error: &sqlx::Error) -> StoreError {
    tracing::error!(%error, "sqlite_store: query failed");
    StoreError::Unavailable { reason: error.to_string() }
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    raw.parse().map_err(|_| StoreError::Unavailable {
        reason: format!("invalid stored uuid {raw}"),
    })
}

fn booking_status_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "pending",
        BookingStatus::Confirmed => "confirmed",
        BookingStatus::Active => "active",
        BookingStatus::Completed => "completed",
        BookingStatus::Cancelled => "cancelled",
        BookingStatus::Refunded => "refunded",
    }
}

fn parse_booking_status(raw: &str) -> Result<BookingStatus, StoreError> {
    match raw {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "active" => Ok(BookingStatus::Active),
        "completed" => Ok(BookingStatus::Completed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        "refunded" => Ok(BookingStatus::Refunded),
        other => Err(StoreError::Unavailable {
            reason: format!("invalid stored booking status {other}"),
        }),
    }
}

fn booking_from_row(row: &SqliteRow) -> Result<BookingRecord, StoreError> {
    let map = |error: sqlx::Error| store_err(&error);
    let cancelled_at: Option<i64> = row.try_get("cancelled_at").map_err(map)?;
    let cancelled_by: Option<String> = row.try_get("cancelled_by").map_err(map)?;
    Ok(BookingRecord {
        id: parse_uuid(row.try_get("id").map_err(map)?)?,
        renter_id: parse_uuid(row.try_get("renter_id").map_err(map)?)?,
        owner_id: parse_uuid(row.try_get("owner_id").map_err(map)?)?,
        gear_title: row.try_get("gear_title").map_err(map)?,
        total_amount_cents: row.try_get("total_amount_cents").map_err(map)?,
        charge_ref: row.try_get("charge_ref").map_err(map)?,
        status: parse_booking_status(row.try_get("status").map_err(map)?)?,
        created_at: from_millis(row.try_get("created_at").map_err(map)?)?,
        start_at: from_millis(row.try_get("start_at").map_err(map)?)?,
        cancelled_at: cancelled_at.map(from_millis).transpose()?,
        cancelled_by: match cancelled_by.as_deref() {
            None => None,
            Some("renter") => Some(CancelledBy::Renter),
            Some("owner") => Some(CancelledBy::Owner),
            Some(other) => {
                return Err(StoreError::Unavailable {
                    reason: format!("invalid stored cancelled_by {other}"),
                });
            }
        },
        pickup_confirmed: row.try_get::<i64, _>("pickup_confirmed").map_err(map)? != 0,
        delivery_confirmed: row.try_get::<i64, _>("delivery_confirmed").map_err(map)? != 0,
        refund_amount_cents: row.try_get("refund_amount_cents").map_err(map)?,
        refund_reason: row.try_get("refund_reason").map_err(map)?,
        refund_case_id: row
            .try_get::<Option<String>, _>("refund_case_id")
            .map_err(map)?
            .as_deref()
            .map(parse_uuid)
            .transpose()?,
    })
}

fn case_from_json(raw: &str) -> Result<AutoRefundCase, StoreError> {
    serde_json::from_str(raw).map_err(|error| StoreError::Unavailable {
        reason: format!("invalid stored case payload: {error}"),
    })
}

fn case_to_json(case: &AutoRefundCase) -> Result<String, StoreError> {
    serde_json::to_string(case).map_err(|error| StoreError::Unavailable {
        reason: format!("case serialization failed: {error}"),
    })
}

impl SqliteStore {
    /// Open or create a SQLite database and initialize the schema.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when the connection or schema creation fails.
    pub async fn new(db_url: &str) -> Result<Self, sqlx::Error> {
        // create_if_missing: sqlx 0.8 defaults to false for file databases;
        // enable explicitly so the demo works out of the box on first run.
        let opts = db_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(opts).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS bookings (
                id                 TEXT    PRIMARY KEY,
                renter_id          TEXT    NOT NULL,
                owner_id           TEXT    NOT NULL,
                gear_title         TEXT    NOT NULL,
                total_amount_cents INTEGER NOT NULL,
                charge_ref         TEXT    NOT NULL,
                status             TEXT    NOT NULL,
                created_at         INTEGER NOT NULL,
                start_at           INTEGER NOT NULL,
                cancelled_at       INTEGER,
                cancelled_by       TEXT,
                pickup_confirmed   INTEGER NOT NULL DEFAULT 0,
                delivery_confirmed INTEGER NOT NULL DEFAULT 0,
                refund_amount_cents INTEGER,
                refund_reason      TEXT,
                refund_case_id     TEXT,
                owner_responded    INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS booking_issues (
                id            TEXT    PRIMARY KEY,
                booking_id    TEXT    NOT NULL,
                opened_at     INTEGER NOT NULL,
                resolved      INTEGER NOT NULL DEFAULT 0,
                owner_replied INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS refund_cases (
                id            TEXT    PRIMARY KEY,
                booking_id    TEXT    NOT NULL,
                trigger_event TEXT    NOT NULL,
                status        TEXT    NOT NULL,
                requires_review INTEGER NOT NULL,
                payload       TEXT    NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        // One open case per (booking, trigger): detection passes race on
        // this constraint, not on a check-then-write.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_refund_cases_open
             ON refund_cases (booking_id, trigger_event)
             WHERE status IN ('pending', 'processing')",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS fraud_scores (
                id          TEXT    PRIMARY KEY,
                booking_id  TEXT    NOT NULL,
                user_id     TEXT    NOT NULL,
                total_score INTEGER NOT NULL,
                risk_level  TEXT    NOT NULL,
                analyzed_at INTEGER NOT NULL,
                payload     TEXT    NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    /// Seed one booking row. Re-seeding the same id overwrites the row, so
    /// repeated demo runs against the same file work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on write failure.
    pub async fn insert_booking(&self, booking: &BookingRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO bookings
             (id, renter_id, owner_id, gear_title, total_amount_cents, charge_ref,
              status, created_at, start_at, cancelled_at, cancelled_by,
              pickup_confirmed, delivery_confirmed,
              refund_amount_cents, refund_reason, refund_case_id, owner_responded)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(booking.id.to_string())
        .bind(booking.renter_id.to_string())
        .bind(booking.owner_id.to_string())
        .bind(&booking.gear_title)
        .bind(booking.total_amount_cents)
        .bind(&booking.charge_ref)
        .bind(booking_status_str(booking.status))
        .bind(to_millis(booking.created_at))
        .bind(to_millis(booking.start_at))
        .bind(booking.cancelled_at.map(to_millis))
        .bind(booking.cancelled_by.map(|by| match by {
            CancelledBy::Renter => "renter",
            CancelledBy::Owner => "owner",
        }))
        .bind(i64::from(booking.pickup_confirmed))
        .bind(i64::from(booking.delivery_confirmed))
        .bind(booking.refund_amount_cents)
        .bind(&booking.refund_reason)
        .bind(booking.refund_case_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        Ok(())
    }

    /// Mark that the owner answered the booking request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on write failure.
    pub async fn record_owner_response(&self, booking_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE bookings SET owner_responded = 1 WHERE id = ?")
            .bind(booking_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| store_err(&e))?;
        Ok(())
    }

    /// Seed one open issue against an active booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on write failure.
    pub async fn insert_issue(
        &self,
        issue_id: Uuid,
        booking_id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO booking_issues (id, booking_id, opened_at, resolved, owner_replied)
             VALUES (?, ?, ?, 0, 0)",
        )
        .bind(issue_id.to_string())
        .bind(booking_id.to_string())
        .bind(to_millis(opened_at))
        .execute(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        Ok(())
    }

    /// Number of audited scores, for the demo summary.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on query failure.
    pub async fn score_count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM fraud_scores")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_err(&e))
    }

    /// Claim-and-update helper: load the case inside a transaction, verify
    /// the expected status, apply `mutate`, write back conditioned on the
    /// status column, commit.
    async fn transition(
        &self,
        id: Uuid,
        expected: CaseStatus,
        next: CaseStatus,
        entry: TimelineEntry,
        mutate: impl FnOnce(&mut AutoRefundCase),
        flip_booking: bool,
    ) -> Result<AutoRefundCase, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| store_err(&e))?;

        let row = sqlx::query("SELECT status, payload FROM refund_cases WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| store_err(&e))?
            .ok_or(StoreError::NotFound { entity: "case", id })?;
        let mut case = case_from_json(row.try_get("payload").map_err(|e| store_err(&e))?)?;
        if case.status != expected {
            return Err(StoreError::Conflict { expected, actual: case.status });
        }

        case.status = next;
        mutate(&mut case);
        case.record(entry);

        let updated = sqlx::query(
            "UPDATE refund_cases SET status = ?, payload = ? WHERE id = ? AND status = ?",
        )
        .bind(next.as_str())
        .bind(case_to_json(&case)?)
        .bind(id.to_string())
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| store_err(&e))?;
        if updated.rows_affected() != 1 {
            return Err(StoreError::Conflict { expected, actual: case.status });
        }

        if flip_booking {
            sqlx::query(
                "UPDATE bookings
                 SET status = 'refunded', refund_amount_cents = ?,
                     refund_reason = ?, refund_case_id = ?
                 WHERE id = ?",
            )
            .bind(case.refund_amount_cents)
            .bind(case.trigger.event.as_str())
            .bind(case.id.to_string())
            .bind(case.booking_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| store_err(&e))?;
        }

        tx.commit().await.map_err(|e| store_err(&e))?;
        Ok(case)
    }
}

impl BookingStore for SqliteStore {
    async fn fetch_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, StoreError> {
        sqlx::query("SELECT * FROM bookings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err(&e))?
            .map(|row| booking_from_row(&row))
            .transpose()
    }

    async fn pending_without_owner_response(
        &self,
        created_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM bookings
             WHERE status = 'pending' AND created_at <= ? AND owner_responded = 0
             ORDER BY created_at LIMIT ?",
        )
        .bind(to_millis(created_before))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn confirmed_no_shows(
        &self,
        started_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM bookings
             WHERE status = 'confirmed' AND start_at <= ?
               AND pickup_confirmed = 0 AND delivery_confirmed = 0
             ORDER BY start_at LIMIT ?",
        )
        .bind(to_millis(started_before))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn active_unresponsive(
        &self,
        issue_open_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<UnresponsiveCandidate>, StoreError> {
        let rows = sqlx::query(
            "SELECT b.*, i.id AS issue_id, i.opened_at AS issue_opened_at
             FROM bookings b
             JOIN booking_issues i ON i.booking_id = b.id
             WHERE b.status = 'active' AND i.resolved = 0 AND i.owner_replied = 0
               AND i.opened_at <= ?
             ORDER BY i.opened_at LIMIT ?",
        )
        .bind(to_millis(issue_open_before))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        rows.iter()
            .map(|row| {
                Ok(UnresponsiveCandidate {
                    booking: booking_from_row(row)?,
                    issue_id: parse_uuid(row.try_get("issue_id").map_err(|e| store_err(&e))?)?,
                    issue_opened_at: from_millis(
                        row.try_get("issue_opened_at").map_err(|e| store_err(&e))?,
                    )?,
                })
            })
            .collect()
    }

    async fn late_owner_cancellations(
        &self,
        window_hours: u32,
        limit: usize,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let window_ms = i64::from(window_hours) * 3_600_000;
        let rows = sqlx::query(
            "SELECT * FROM bookings
             WHERE status = 'cancelled' AND cancelled_by = 'owner'
               AND cancelled_at IS NOT NULL AND start_at - cancelled_at <= ?
             ORDER BY cancelled_at LIMIT ?",
        )
        .bind(window_ms)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        rows.iter().map(booking_from_row).collect()
    }
}

impl CaseStore for SqliteStore {
    async fn create_if_absent(&self, case: AutoRefundCase) -> Result<CaseCreation, StoreError> {
        let result = sqlx::query(
            "INSERT INTO refund_cases (id, booking_id, trigger_event, status, requires_review, payload)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(case.id.to_string())
        .bind(case.booking_id.to_string())
        .bind(case.trigger.event.as_str())
        .bind(case.status.as_str())
        .bind(i64::from(case.trigger.requires_manual_review))
        .bind(case_to_json(&case)?)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(CaseCreation::Created(case)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(CaseCreation::DuplicateOpen)
            }
            Err(error) => Err(store_err(&error)),
        }
    }

    async fn fetch_case(&self, id: Uuid) -> Result<Option<AutoRefundCase>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT payload FROM refund_cases WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err(&e))?
            .map(|payload| case_from_json(&payload))
            .transpose()
    }

    async fn begin_processing(
        &self,
        id: Uuid,
        expected: CaseStatus,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        let at = entry.at;
        self.transition(
            id,
            expected,
            CaseStatus::Processing,
            entry,
            |case| {
                case.refund.initiated_at = Some(at);
                case.refund.failed_at = None;
                case.refund.failure_reason = None;
            },
            false,
        )
        .await
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        external_refund_id: &str,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        let at = entry.at;
        let refund_id = external_refund_id.to_owned();
        self.transition(
            id,
            CaseStatus::Processing,
            CaseStatus::Completed,
            entry,
            move |case| {
                case.refund.completed_at = Some(at);
                case.refund.external_refund_id = Some(refund_id);
            },
            true,
        )
        .await
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        reason: &str,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        let at = entry.at;
        let reason = reason.to_owned();
        self.transition(
            id,
            CaseStatus::Processing,
            CaseStatus::Failed,
            entry,
            move |case| {
                case.refund.failed_at = Some(at);
                case.refund.failure_reason = Some(reason);
            },
            false,
        )
        .await
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        entry: TimelineEntry,
    ) -> Result<AutoRefundCase, StoreError> {
        self.transition(id, CaseStatus::Pending, CaseStatus::Cancelled, entry, |_| {}, false)
            .await
    }

    async fn open_cases_requiring_review(&self) -> Result<Vec<AutoRefundCase>, StoreError> {
        let payloads: Vec<String> = sqlx::query_scalar(
            "SELECT payload FROM refund_cases
             WHERE status = 'pending' AND requires_review = 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        payloads.iter().map(|payload| case_from_json(payload)).collect()
    }
}

impl ScoreAudit for SqliteStore {
    async fn record_score(&self, score: &FraudScore) -> Result<(), StoreError> {
        let payload = serde_json::to_string(score).map_err(|error| StoreError::Unavailable {
            reason: format!("score serialization failed: {error}"),
        })?;
        sqlx::query(
            "INSERT INTO fraud_scores
             (id, booking_id, user_id, total_score, risk_level, analyzed_at, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(score.booking_id.to_string())
        .bind(score.user_id.to_string())
        .bind(i64::from(score.total_score))
        .bind(format!("{:?}", score.risk_level).to_lowercase())
        .bind(to_millis(score.analyzed_at))
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err(&e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use chrono::TimeZone as _;
    use domain::{RefundTrigger, TriggerEvent, TriggerEvidence};

    // Every test opens a fresh in-memory database, so tests are fully
    // isolated with no on-disk side effects.
    async fn make_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:")
            .await
            .expect("in-memory SQLite should open")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn make_booking(status: BookingStatus, created_ago_hours: i64) -> BookingRecord {
        BookingRecord {
            id: Uuid::new_v4(),
            renter_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            gear_title: "Petzl climbing kit".to_owned(),
            total_amount_cents: 7_500,
            charge_ref: "ch_sqlite".to_owned(),
            status,
            created_at: t0() - Duration::hours(created_ago_hours),
            start_at: t0() + Duration::days(1),
            cancelled_at: None,
            cancelled_by: None,
            pickup_confirmed: false,
            delivery_confirmed: false,
            refund_amount_cents: None,
            refund_reason: None,
            refund_case_id: None,
        }
    }

    fn make_case(booking: &BookingRecord, event: TriggerEvent) -> AutoRefundCase {
        let trigger = RefundTrigger {
            event,
            description: "test trigger".to_owned(),
            timeout_hours: 24,
            refund_percentage: 1.0,
            requires_manual_review: event == TriggerEvent::UnresponsiveDuringRental,
        };
        let evidence = match event {
            TriggerEvent::UnresponsiveDuringRental => TriggerEvidence::UnresponsiveDuringRental {
                issue_id: Uuid::new_v4(),
                unresolved_hours: 14,
            },
            _ => TriggerEvidence::NoInitialResponse { booking_age_hours: 30 },
        };
        AutoRefundCase::detect(booking, trigger, evidence, t0())
    }

    #[tokio::test]
    async fn booking_round_trips_through_the_schema() {
        let store = make_store().await;
        let mut booking = make_booking(BookingStatus::Cancelled, 40);
        booking.cancelled_at = Some(t0() - Duration::hours(2));
        booking.cancelled_by = Some(CancelledBy::Owner);
        store.insert_booking(&booking).await.unwrap();

        let fetched = store.fetch_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(fetched, booking);
    }

    #[tokio::test]
    async fn pending_query_excludes_answered_bookings() {
        let store = make_store().await;
        let silent = make_booking(BookingStatus::Pending, 30);
        let answered = make_booking(BookingStatus::Pending, 30);
        let fresh = make_booking(BookingStatus::Pending, 2);
        store.insert_booking(&silent).await.unwrap();
        store.insert_booking(&answered).await.unwrap();
        store.insert_booking(&fresh).await.unwrap();
        store.record_owner_response(answered.id).await.unwrap();

        let cutoff = t0() - Duration::hours(24);
        let found = store.pending_without_owner_response(cutoff, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, silent.id);
    }

    // A cancellation exactly 24h before the start still matches the query.
    #[tokio::test]
    async fn late_cancellation_window_includes_the_boundary() {
        let store = make_store().await;
        let mut on_boundary = make_booking(BookingStatus::Cancelled, 96);
        on_boundary.start_at = t0() + Duration::hours(23);
        on_boundary.cancelled_at = Some(t0() - Duration::hours(1));
        on_boundary.cancelled_by = Some(CancelledBy::Owner);
        let mut early = make_booking(BookingStatus::Cancelled, 96);
        early.start_at = t0() + Duration::hours(48);
        early.cancelled_at = Some(t0() - Duration::hours(1));
        early.cancelled_by = Some(CancelledBy::Owner);
        store.insert_booking(&on_boundary).await.unwrap();
        store.insert_booking(&early).await.unwrap();

        let found = store.late_owner_cancellations(24, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, on_boundary.id);
    }

    #[tokio::test]
    async fn stale_issue_join_finds_unresponsive_rentals() {
        let store = make_store().await;
        let rental = make_booking(BookingStatus::Active, 72);
        store.insert_booking(&rental).await.unwrap();
        let issue_id = Uuid::new_v4();
        store
            .insert_issue(issue_id, rental.id, t0() - Duration::hours(14))
            .await
            .unwrap();

        let found = store
            .active_unresponsive(t0() - Duration::hours(12), 100)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].issue_id, issue_id);
        assert_eq!(found[0].booking.id, rental.id);

        // An issue fresher than the cutoff is not a candidate.
        let none = store
            .active_unresponsive(t0() - Duration::hours(24), 100)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn partial_index_blocks_duplicate_open_cases() {
        let store = make_store().await;
        let booking = make_booking(BookingStatus::Pending, 30);
        store.insert_booking(&booking).await.unwrap();

        let first = store
            .create_if_absent(make_case(&booking, TriggerEvent::NoInitialResponse))
            .await
            .unwrap();
        assert!(matches!(first, CaseCreation::Created(_)));

        let second = store
            .create_if_absent(make_case(&booking, TriggerEvent::NoInitialResponse))
            .await
            .unwrap();
        assert!(matches!(second, CaseCreation::DuplicateOpen));

        // A different trigger on the same booking is a separate case.
        let other = store
            .create_if_absent(make_case(&booking, TriggerEvent::NoShow))
            .await
            .unwrap();
        assert!(matches!(other, CaseCreation::Created(_)));
    }

    #[tokio::test]
    async fn settled_case_frees_the_slot_for_a_new_one() {
        let store = make_store().await;
        let booking = make_booking(BookingStatus::Pending, 30);
        store.insert_booking(&booking).await.unwrap();
        let case = make_case(&booking, TriggerEvent::NoInitialResponse);
        let case_id = case.id;
        store.create_if_absent(case).await.unwrap();

        store
            .begin_processing(
                case_id,
                CaseStatus::Pending,
                TimelineEntry::new(t0(), "processing_started", "auto"),
            )
            .await
            .unwrap();
        store
            .mark_failed(
                case_id,
                "gateway down",
                TimelineEntry::new(t0(), "refund_failed", "gateway down"),
            )
            .await
            .unwrap();

        // The partial index only covers open statuses.
        let reopened = store
            .create_if_absent(make_case(&booking, TriggerEvent::NoInitialResponse))
            .await
            .unwrap();
        assert!(matches!(reopened, CaseCreation::Created(_)));
    }

    #[tokio::test]
    async fn completion_is_atomic_with_the_booking_flip() {
        let store = make_store().await;
        let booking = make_booking(BookingStatus::Pending, 30);
        store.insert_booking(&booking).await.unwrap();
        let case = make_case(&booking, TriggerEvent::NoInitialResponse);
        let case_id = case.id;
        store.create_if_absent(case).await.unwrap();

        store
            .begin_processing(
                case_id,
                CaseStatus::Pending,
                TimelineEntry::new(t0(), "processing_started", "auto"),
            )
            .await
            .unwrap();
        let settled = store
            .mark_completed(
                case_id,
                "re_sqlite_1",
                TimelineEntry::new(t0(), "refund_completed", "done"),
            )
            .await
            .unwrap();

        assert_eq!(settled.status, CaseStatus::Completed);
        assert_eq!(settled.refund.external_refund_id.as_deref(), Some("re_sqlite_1"));
        let flipped = store.fetch_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(flipped.status, BookingStatus::Refunded);
        assert_eq!(flipped.refund_amount_cents, Some(settled.refund_amount_cents));
        assert_eq!(flipped.refund_reason.as_deref(), Some("no_initial_response"));
        assert_eq!(flipped.refund_case_id, Some(case_id));
        // Timeline survives the JSON round trip.
        let reloaded = store.fetch_case(case_id).await.unwrap().unwrap();
        assert_eq!(reloaded.timeline.len(), 3);
    }

    #[tokio::test]
    async fn wrong_status_claim_is_a_conflict() {
        let store = make_store().await;
        let booking = make_booking(BookingStatus::Pending, 30);
        store.insert_booking(&booking).await.unwrap();
        let case = make_case(&booking, TriggerEvent::NoInitialResponse);
        let case_id = case.id;
        store.create_if_absent(case).await.unwrap();

        let error = store
            .begin_processing(
                case_id,
                CaseStatus::Failed,
                TimelineEntry::new(t0(), "processing_started", "retry"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::Conflict { expected: CaseStatus::Failed, actual: CaseStatus::Pending }
        ));
    }

    #[tokio::test]
    async fn review_queue_lists_only_gated_pending_cases() {
        let store = make_store().await;
        let auto_booking = make_booking(BookingStatus::Pending, 30);
        let gated_booking = make_booking(BookingStatus::Active, 72);
        store.insert_booking(&auto_booking).await.unwrap();
        store.insert_booking(&gated_booking).await.unwrap();
        store
            .create_if_absent(make_case(&auto_booking, TriggerEvent::NoInitialResponse))
            .await
            .unwrap();
        store
            .create_if_absent(make_case(&gated_booking, TriggerEvent::UnresponsiveDuringRental))
            .await
            .unwrap();

        let queue = store.open_cases_requiring_review().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].booking_id, gated_booking.id);
    }

    #[tokio::test]
    async fn scores_are_audited_as_rows() {
        let store = make_store().await;
        let score = scoring::aggregate::aggregate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            domain::UserType::Renter,
            vec![],
            t0(),
            "rules-v1",
        );
        store.record_score(&score).await.unwrap();
        assert_eq!(store.score_count().await.unwrap(), 1);
    }
}
