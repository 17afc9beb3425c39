//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be wired into the
//! booking service. The guarantee that at most one active reservation exists
//! per venue-day lives behind `ReservationRepo`, in the shared store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{
    AccountId, Reservation, ReservationId, ReservationStatus, ReservationSummary, Venue, VenueId,
};

/// Read access to the venue collaborator.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VenueDirectory: Send + Sync {
    async fn get_venue(&self, id: VenueId) -> Result<Option<Venue>>;
}

/// Durable storage of reservation records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReservationRepo: Send + Sync {
    /// Persists a `pending` reservation.
    ///
    /// Must refuse, as one atomic store operation, a reservation whose
    /// venue-day already holds an active reservation (`AlreadyRequested`),
    /// whose date the owner blocked (`MarkedUnavailable`), or whose venue is
    /// closed (`VenueClosed`).
    async fn insert_pending(&self, reservation: &Reservation) -> Result<()>;

    /// Fetches one reservation joined with its venue.
    async fn find_summary(&self, id: ReservationId) -> Result<Option<ReservationSummary>>;

    /// Number of `pending`/`confirmed` reservations for the venue-day.
    async fn count_active(&self, venue_id: VenueId, date: NaiveDate) -> Result<u64>;

    /// Dates in `[from, to]` that hold an active reservation.
    async fn active_dates(
        &self,
        venue_id: VenueId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>>;

    /// Compare-and-set status write. Returns the number of rows changed.
    async fn update_status_if(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        status: ReservationStatus,
    ) -> Result<u64>;

    /// Reservations on every venue owned by `owner_id`, newest event first.
    async fn list_for_owner(
        &self,
        owner_id: AccountId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ReservationSummary>>;

    /// The renter's own reservations, newest event first.
    async fn list_for_renter(&self, renter_id: AccountId) -> Result<Vec<ReservationSummary>>;
}

/// Per-venue set of dates the owner marked unavailable.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn is_unavailable(&self, venue_id: VenueId, date: NaiveDate) -> Result<bool>;

    /// Blocked dates in `[from, to]`.
    async fn unavailable_between(
        &self,
        venue_id: VenueId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeSet<NaiveDate>>;

    /// Returns `false` if the date was already blocked.
    async fn mark_unavailable(&self, venue_id: VenueId, date: NaiveDate) -> Result<bool>;

    /// Returns `false` if the date was not blocked.
    async fn clear_unavailable(&self, venue_id: VenueId, date: NaiveDate) -> Result<bool>;

    /// Atomically swaps the venue's whole set for `dates`.
    async fn replace_unavailable(&self, venue_id: VenueId, dates: &BTreeSet<NaiveDate>) -> Result<()>;
}

/// Source of "today" and "now" for validation, calendars and audit stamps.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock; "today" is the local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { today, now }
    }

    /// Frozen at midnight UTC of `today`.
    pub fn at(today: NaiveDate) -> Self {
        Self {
            today,
            now: today.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
