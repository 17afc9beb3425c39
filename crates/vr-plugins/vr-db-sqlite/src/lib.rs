//! # vr-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `vr-core` domain models. One `SqliteStore` backs all three storage
//! ports so that conflict checks and inserts see the same database.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;
use vr_core::error::{AppError, ConflictReason, Result};
use vr_core::models::{
    AccountId, ContactInfo, Reservation, ReservationId, ReservationStatus, ReservationSummary,
    Venue, VenueId, VenueStatus,
};
use vr_core::traits::{AvailabilityStore, ReservationRepo, VenueDirectory};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const SUMMARY_SELECT: &str = "SELECT r.id, r.venue_id, r.renter_id, r.event_date, r.start_time, \
     r.end_time, r.status, r.first_name, r.last_name, r.email, r.mobile_country_code, \
     r.mobile_number, r.address, r.country, r.notes, r.voucher_code, r.created_at, \
     v.title AS venue_title, v.owner_id AS venue_owner_id \
     FROM reservations r JOIN venues v ON v.id = r.venue_id";

const SUMMARY_ORDER: &str = "ORDER BY r.event_date DESC, r.created_at DESC, r.id DESC";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url`.
    ///
    /// In-memory databases live only as long as their connection, so they get
    /// a single connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(store_err)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(store_err)?;
        info!(in_memory, "sqlite store connected");
        Ok(Self { pool })
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))
    }

    /// Opens a fresh in-memory store with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::connect("sqlite::memory:", 1).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts or refreshes a venue in the local read model.
    pub async fn upsert_venue(&self, venue: &Venue) -> Result<()> {
        sqlx::query(
            "INSERT INTO venues (id, owner_id, title, price_per_hour, status) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET owner_id = excluded.owner_id, title = excluded.title, \
             price_per_hour = excluded.price_per_hour, status = excluded.status",
        )
        .bind(uuid_to_blob(venue.id))
        .bind(uuid_to_blob(venue.owner_id))
        .bind(&venue.title)
        .bind(venue.price_per_hour.to_string())
        .bind(venue.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn venue_status(&self, venue_id: VenueId) -> Result<Option<VenueStatus>> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM venues WHERE id = ?")
            .bind(uuid_to_blob(venue_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        status
            .map(|s| s.parse::<VenueStatus>().map_err(|e| corrupt("venues.status", e)))
            .transpose()
    }

    async fn fetch_summaries(
        &self,
        filter: &str,
        owner_or_renter: Uuid,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ReservationSummary>> {
        let sql = match status {
            Some(_) => format!("{SUMMARY_SELECT} WHERE {filter} = ? AND r.status = ? {SUMMARY_ORDER}"),
            None => format!("{SUMMARY_SELECT} WHERE {filter} = ? {SUMMARY_ORDER}"),
        };
        let mut query = sqlx::query(&sql).bind(uuid_to_blob(owner_or_renter));
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(store_err)?;
        rows.iter().map(summary_from_row).collect()
    }
}

// Helpers for column conversion

fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(blob).map_err(|e| corrupt("uuid", e))
}

fn date_to_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn text_to_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| corrupt("date", e))
}

fn time_to_text(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn text_to_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_FORMAT).map_err(|e| corrupt("time", e))
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> AppError {
    AppError::StoreUnavailable(format!("unreadable {column}: {err}"))
}

fn store_err(err: sqlx::Error) -> AppError {
    AppError::StoreUnavailable(err.to_string())
}

/// Like `store_err`, but a unique-index violation means the venue-day is held.
fn write_err(err: sqlx::Error) -> AppError {
    let unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if unique {
        debug!("active-day index rejected write");
        AppError::Conflict(ConflictReason::AlreadyRequested)
    } else {
        store_err(err)
    }
}

fn summary_from_row(row: &SqliteRow) -> Result<ReservationSummary> {
    let renter_id: Option<Vec<u8>> = row.try_get("renter_id").map_err(store_err)?;
    let status: String = row.try_get("status").map_err(store_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(store_err)?;

    let reservation = Reservation {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id").map_err(store_err)?)?,
        venue_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("venue_id").map_err(store_err)?)?,
        renter_id: renter_id.as_deref().map(blob_to_uuid).transpose()?,
        event_date: text_to_date(&row.try_get::<String, _>("event_date").map_err(store_err)?)?,
        start_time: text_to_time(&row.try_get::<String, _>("start_time").map_err(store_err)?)?,
        end_time: text_to_time(&row.try_get::<String, _>("end_time").map_err(store_err)?)?,
        status: status
            .parse::<ReservationStatus>()
            .map_err(|e| corrupt("reservations.status", e))?,
        contact: ContactInfo {
            first_name: row.try_get("first_name").map_err(store_err)?,
            last_name: row.try_get("last_name").map_err(store_err)?,
            email: row.try_get("email").map_err(store_err)?,
            mobile_country_code: row.try_get("mobile_country_code").map_err(store_err)?,
            mobile_number: row.try_get("mobile_number").map_err(store_err)?,
            address: row.try_get("address").map_err(store_err)?,
            country: row.try_get("country").map_err(store_err)?,
            notes: row.try_get("notes").map_err(store_err)?,
            voucher_code: row.try_get("voucher_code").map_err(store_err)?,
        },
        created_at: DateTime::<Utc>::from_timestamp_micros(created_at)
            .ok_or_else(|| corrupt("created_at", created_at))?,
    };

    Ok(ReservationSummary {
        reservation,
        venue_title: row.try_get("venue_title").map_err(store_err)?,
        venue_owner_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("venue_owner_id").map_err(store_err)?)?,
    })
}

#[async_trait]
impl VenueDirectory for SqliteStore {
    async fn get_venue(&self, id: VenueId) -> Result<Option<Venue>> {
        let row = sqlx::query("SELECT id, owner_id, title, price_per_hour, status FROM venues WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let price: String = row.try_get("price_per_hour").map_err(store_err)?;
        let status: String = row.try_get("status").map_err(store_err)?;
        Ok(Some(Venue {
            id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id").map_err(store_err)?)?,
            owner_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("owner_id").map_err(store_err)?)?,
            title: row.try_get("title").map_err(store_err)?,
            price_per_hour: Decimal::from_str(&price).map_err(|e| corrupt("price_per_hour", e))?,
            status: status
                .parse::<VenueStatus>()
                .map_err(|e| corrupt("venues.status", e))?,
        }))
    }
}

#[async_trait]
impl ReservationRepo for SqliteStore {
    /// Single statement: the insert only happens if the venue is open and the
    /// date is not blocked; the partial unique index rejects a second active
    /// reservation on the venue-day.
    async fn insert_pending(&self, reservation: &Reservation) -> Result<()> {
        let contact = &reservation.contact;
        let event_date = date_to_text(reservation.event_date);
        let result = sqlx::query(
            "INSERT INTO reservations (id, venue_id, renter_id, event_date, start_time, end_time, \
             status, first_name, last_name, email, mobile_country_code, mobile_number, address, \
             country, notes, voucher_code, created_at) \
             SELECT ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?, ?, ?, ?, ?, ?, ? \
             WHERE EXISTS (SELECT 1 FROM venues WHERE id = ? AND status = 'open') \
             AND NOT EXISTS (SELECT 1 FROM unavailable_dates WHERE venue_id = ? AND unavailable_date = ?)",
        )
        .bind(uuid_to_blob(reservation.id))
        .bind(uuid_to_blob(reservation.venue_id))
        .bind(reservation.renter_id.map(uuid_to_blob))
        .bind(&event_date)
        .bind(time_to_text(reservation.start_time))
        .bind(time_to_text(reservation.end_time))
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.email)
        .bind(&contact.mobile_country_code)
        .bind(&contact.mobile_number)
        .bind(&contact.address)
        .bind(&contact.country)
        .bind(&contact.notes)
        .bind(&contact.voucher_code)
        .bind(reservation.created_at.timestamp_micros())
        .bind(uuid_to_blob(reservation.venue_id))
        .bind(uuid_to_blob(reservation.venue_id))
        .bind(&event_date)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing inserted: work out which guard refused it.
        match self.venue_status(reservation.venue_id).await? {
            None => Err(AppError::not_found("Venue", reservation.venue_id)),
            Some(VenueStatus::Closed) => Err(AppError::Conflict(ConflictReason::VenueClosed)),
            Some(VenueStatus::Open) => Err(AppError::Conflict(ConflictReason::MarkedUnavailable)),
        }
    }

    async fn find_summary(&self, id: ReservationId) -> Result<Option<ReservationSummary>> {
        let sql = format!("{SUMMARY_SELECT} WHERE r.id = ?");
        let row = sqlx::query(&sql)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(summary_from_row).transpose()
    }

    async fn count_active(&self, venue_id: VenueId, date: NaiveDate) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations \
             WHERE venue_id = ? AND event_date = ? AND status IN ('pending', 'confirmed')",
        )
        .bind(uuid_to_blob(venue_id))
        .bind(date_to_text(date))
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(count.max(0) as u64)
    }

    async fn active_dates(
        &self,
        venue_id: VenueId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT event_date FROM reservations \
             WHERE venue_id = ? AND event_date BETWEEN ? AND ? AND status IN ('pending', 'confirmed')",
        )
        .bind(uuid_to_blob(venue_id))
        .bind(date_to_text(from))
        .bind(date_to_text(to))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(|d| text_to_date(d)).collect()
    }

    async fn update_status_if(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        status: ReservationStatus,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE reservations SET status = ? WHERE id = ? AND status = ?")
            .bind(status.as_str())
            .bind(uuid_to_blob(id))
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(result.rows_affected())
    }

    async fn list_for_owner(
        &self,
        owner_id: AccountId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ReservationSummary>> {
        self.fetch_summaries("v.owner_id", owner_id, status).await
    }

    async fn list_for_renter(&self, renter_id: AccountId) -> Result<Vec<ReservationSummary>> {
        self.fetch_summaries("r.renter_id", renter_id, None).await
    }
}

#[async_trait]
impl AvailabilityStore for SqliteStore {
    async fn is_unavailable(&self, venue_id: VenueId, date: NaiveDate) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM unavailable_dates WHERE venue_id = ? AND unavailable_date = ?",
        )
        .bind(uuid_to_blob(venue_id))
        .bind(date_to_text(date))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(found.is_some())
    }

    async fn unavailable_between(
        &self,
        venue_id: VenueId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT unavailable_date FROM unavailable_dates \
             WHERE venue_id = ? AND unavailable_date BETWEEN ? AND ?",
        )
        .bind(uuid_to_blob(venue_id))
        .bind(date_to_text(from))
        .bind(date_to_text(to))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(|d| text_to_date(d)).collect()
    }

    async fn mark_unavailable(&self, venue_id: VenueId, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO unavailable_dates (venue_id, unavailable_date) VALUES (?, ?)",
        )
        .bind(uuid_to_blob(venue_id))
        .bind(date_to_text(date))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_unavailable(&self, venue_id: VenueId, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM unavailable_dates WHERE venue_id = ? AND unavailable_date = ?",
        )
        .bind(uuid_to_blob(venue_id))
        .bind(date_to_text(date))
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete-then-insert inside one transaction, so readers never see a
    /// half-replaced set.
    async fn replace_unavailable(&self, venue_id: VenueId, dates: &BTreeSet<NaiveDate>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query("DELETE FROM unavailable_dates WHERE venue_id = ?")
            .bind(uuid_to_blob(venue_id))
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        for date in dates {
            sqlx::query("INSERT INTO unavailable_dates (venue_id, unavailable_date) VALUES (?, ?)")
                .bind(uuid_to_blob(venue_id))
                .bind(date_to_text(*date))
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }
}
