//! # Booking Service
//!
//! Orchestrates validation, conflict checking, lifecycle transitions and
//! calendar generation over injected ports. Holds no state of its own; every
//! call is a bounded request/response against the shared store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::calendar::{self, MonthGrid};
use crate::conflict::{Availability, ConflictChecker};
use crate::error::{AppError, ConflictReason, Result, ValidationErrors};
use crate::lifecycle::LifecycleManager;
use crate::models::{
    AccountId, Actor, ActorRole, RenterSummary, Reservation, ReservationId, ReservationStatus,
    ReservationSummary, TransitionOutcome, Venue, VenueId,
};
use crate::traits::{AvailabilityStore, Clock, ReservationRepo, VenueDirectory};
use crate::validation::{validate_reservation, ReservationForm};

#[derive(Clone)]
pub struct BookingService {
    venues: Arc<dyn VenueDirectory>,
    reservations: Arc<dyn ReservationRepo>,
    availability: Arc<dyn AvailabilityStore>,
    clock: Arc<dyn Clock>,
    checker: ConflictChecker,
    lifecycle: LifecycleManager,
}

impl BookingService {
    pub fn new(
        venues: Arc<dyn VenueDirectory>,
        reservations: Arc<dyn ReservationRepo>,
        availability: Arc<dyn AvailabilityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            checker: ConflictChecker::new(reservations.clone(), availability.clone()),
            lifecycle: LifecycleManager::new(reservations.clone()),
            venues,
            reservations,
            availability,
            clock,
        }
    }

    /// Validates the form, checks the venue-day, and stores a `pending`
    /// reservation. Returns the new reservation's id.
    #[instrument(skip(self, form))]
    pub async fn create_reservation(
        &self,
        venue_id: VenueId,
        renter_id: Option<AccountId>,
        form: &ReservationForm,
    ) -> Result<ReservationId> {
        let validated =
            validate_reservation(form, self.clock.today()).map_err(AppError::ValidationError)?;

        let venue = self.venue(venue_id).await?;
        if !venue.accepts_reservations() {
            return Err(AppError::Conflict(ConflictReason::VenueClosed));
        }

        if let Availability::Conflict(reason) =
            self.checker.check(venue_id, validated.event_date).await?
        {
            return Err(AppError::Conflict(reason));
        }

        let reservation = Reservation {
            id: Uuid::now_v7(),
            venue_id,
            renter_id,
            event_date: validated.event_date,
            start_time: validated.start_time,
            end_time: validated.end_time,
            status: ReservationStatus::Pending,
            contact: validated.contact,
            created_at: self.clock.now(),
        };
        // The store re-checks atomically; a racing request loses here.
        self.reservations.insert_pending(&reservation).await?;

        info!(reservation_id = %reservation.id, %venue_id, event_date = %reservation.event_date, "reservation requested");
        Ok(reservation.id)
    }

    pub async fn check_availability(&self, venue_id: VenueId, date: NaiveDate) -> Result<Availability> {
        self.venue(venue_id).await?;
        self.checker.check(venue_id, date).await
    }

    /// All reservations on the owner's venues. An unrecognised `status_filter`
    /// means no filter.
    pub async fn list_for_owner(
        &self,
        owner_id: AccountId,
        status_filter: Option<&str>,
    ) -> Result<Vec<ReservationSummary>> {
        let status = status_filter.and_then(|raw| raw.parse::<ReservationStatus>().ok());
        self.reservations.list_for_owner(owner_id, status).await
    }

    pub async fn list_for_renter(&self, renter_id: AccountId) -> Result<Vec<ReservationSummary>> {
        self.reservations.list_for_renter(renter_id).await
    }

    /// Reservation details as shown to the venue owner.
    pub async fn reservation_for_owner(
        &self,
        id: ReservationId,
        actor: &Actor,
    ) -> Result<ReservationSummary> {
        let summary = self.summary(id).await?;
        if actor.role != ActorRole::Owner || summary.venue_owner_id != actor.id {
            warn!(reservation_id = %id, actor_id = %actor.id, "details requested by non-owner");
            return Err(AppError::Forbidden(
                "you are not authorized to view this reservation".to_string(),
            ));
        }
        Ok(summary)
    }

    /// Reservation details as shown to the renter who made it.
    pub async fn reservation_for_renter(
        &self,
        id: ReservationId,
        actor: &Actor,
    ) -> Result<ReservationSummary> {
        let summary = self.summary(id).await?;
        if summary.reservation.renter_id != Some(actor.id) {
            warn!(reservation_id = %id, actor_id = %actor.id, "details requested by another renter");
            return Err(AppError::Forbidden(
                "reservation does not belong to you".to_string(),
            ));
        }
        Ok(summary)
    }

    pub async fn renter_summary(&self, renter_id: AccountId) -> Result<RenterSummary> {
        let today = self.clock.today();
        let rows = self.reservations.list_for_renter(renter_id).await?;
        Ok(rows.iter().fold(RenterSummary::default(), |mut acc, row| {
            let r = &row.reservation;
            acc.total += 1;
            match r.status {
                ReservationStatus::Pending => acc.pending += 1,
                ReservationStatus::Confirmed if r.event_date >= today => acc.upcoming_confirmed += 1,
                _ => {}
            }
            acc
        }))
    }

    pub async fn owner_pending_count(&self, owner_id: AccountId) -> Result<usize> {
        Ok(self
            .reservations
            .list_for_owner(owner_id, Some(ReservationStatus::Pending))
            .await?
            .len())
    }

    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn accept(&self, id: ReservationId, actor: &Actor) -> Result<TransitionOutcome> {
        self.lifecycle.accept(id, actor).await
    }

    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn reject(&self, id: ReservationId, actor: &Actor) -> Result<TransitionOutcome> {
        self.lifecycle.reject(id, actor).await
    }

    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn set_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
        actor: &Actor,
    ) -> Result<TransitionOutcome> {
        self.lifecycle.set_status(id, status, actor).await
    }

    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn cancel_own(&self, id: ReservationId, actor: &Actor) -> Result<TransitionOutcome> {
        self.lifecycle.cancel_own(id, actor).await
    }

    /// Month grid for a venue. Owner-blocked dates and dates holding an
    /// active reservation are both shown as unavailable.
    pub async fn venue_calendar(
        &self,
        venue_id: VenueId,
        year: i32,
        month: u32,
        selected: Option<NaiveDate>,
    ) -> Result<MonthGrid> {
        let (first, last) = calendar::month_bounds(year, month)?;
        self.venue(venue_id).await?;

        let mut blocked = self.availability.unavailable_between(venue_id, first, last).await?;
        blocked.extend(self.reservations.active_dates(venue_id, first, last).await?);

        let grid = calendar::generate_month(year, month, &blocked, self.clock.today())?;
        Ok(match selected {
            Some(date) => grid.select(date),
            None => grid,
        })
    }

    pub async fn mark_unavailable(&self, venue_id: VenueId, date: NaiveDate, actor: &Actor) -> Result<bool> {
        self.owned_venue(venue_id, actor).await?;
        self.availability.mark_unavailable(venue_id, date).await
    }

    pub async fn clear_unavailable(&self, venue_id: VenueId, date: NaiveDate, actor: &Actor) -> Result<bool> {
        self.owned_venue(venue_id, actor).await?;
        self.availability.clear_unavailable(venue_id, date).await
    }

    pub async fn replace_unavailable_dates(
        &self,
        venue_id: VenueId,
        dates: &BTreeSet<NaiveDate>,
        actor: &Actor,
    ) -> Result<()> {
        self.owned_venue(venue_id, actor).await?;
        self.availability.replace_unavailable(venue_id, dates).await?;
        info!(%venue_id, count = dates.len(), "unavailable dates replaced");
        Ok(())
    }

    /// Price per hour times the booked duration, to the minute.
    pub async fn estimate_cost(&self, venue_id: VenueId, start: NaiveTime, end: NaiveTime) -> Result<Decimal> {
        if start >= end {
            let mut errors = ValidationErrors::new();
            errors.add("end_time", "End time must be after start time.");
            return Err(AppError::ValidationError(errors));
        }
        let venue = self.venue(venue_id).await?;
        estimate(venue.price_per_hour, start, end).ok_or_else(|| {
            warn!(%venue_id, price_per_hour = %venue.price_per_hour, "cost estimate overflowed");
            let mut errors = ValidationErrors::new();
            errors.add("price_per_hour", "Estimated cost is too large to compute.");
            AppError::ValidationError(errors)
        })
    }

    async fn venue(&self, venue_id: VenueId) -> Result<Venue> {
        self.venues
            .get_venue(venue_id)
            .await?
            .ok_or_else(|| AppError::not_found("Venue", venue_id))
    }

    async fn owned_venue(&self, venue_id: VenueId, actor: &Actor) -> Result<Venue> {
        let venue = self.venue(venue_id).await?;
        if actor.role != ActorRole::Owner || venue.owner_id != actor.id {
            warn!(%venue_id, actor_id = %actor.id, "availability change attempted by non-owner");
            return Err(AppError::Forbidden(
                "only the venue owner may change its availability".to_string(),
            ));
        }
        Ok(venue)
    }

    async fn summary(&self, id: ReservationId) -> Result<ReservationSummary> {
        self.reservations
            .find_summary(id)
            .await?
            .ok_or_else(|| AppError::not_found("Reservation", id))
    }
}

/// `None` when the total does not fit in a `Decimal`.
fn estimate(price_per_hour: Decimal, start: NaiveTime, end: NaiveTime) -> Option<Decimal> {
    let minutes = (end - start).num_minutes();
    price_per_hour
        .checked_mul(Decimal::from(minutes))?
        .checked_div(Decimal::from(60))
        .map(|total| total.round_dp(2))
}
