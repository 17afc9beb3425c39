//! # Conflict Checker
//!
//! Decides whether a venue-day can take a new reservation. The venue-day rule
//! ignores hours: any active reservation on the date blocks the whole day.
//! Read-only; the store repeats the same checks atomically on insert.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{ConflictReason, Result};
use crate::models::VenueId;
use crate::traits::{AvailabilityStore, ReservationRepo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "availability", content = "reason", rename_all = "snake_case")]
pub enum Availability {
    Admissible,
    Conflict(ConflictReason),
}

impl Availability {
    pub fn is_admissible(&self) -> bool {
        matches!(self, Self::Admissible)
    }
}

#[derive(Clone)]
pub struct ConflictChecker {
    reservations: Arc<dyn ReservationRepo>,
    availability: Arc<dyn AvailabilityStore>,
}

impl ConflictChecker {
    pub fn new(reservations: Arc<dyn ReservationRepo>, availability: Arc<dyn AvailabilityStore>) -> Self {
        Self {
            reservations,
            availability,
        }
    }

    /// `venue_id` must name an existing venue; `date` is already parsed.
    pub async fn check(&self, venue_id: VenueId, date: NaiveDate) -> Result<Availability> {
        let active = self.reservations.count_active(venue_id, date).await?;
        if active > 0 {
            debug!(%venue_id, %date, active, "venue-day already held");
            return Ok(Availability::Conflict(ConflictReason::AlreadyRequested));
        }

        if self.availability.is_unavailable(venue_id, date).await? {
            debug!(%venue_id, %date, "venue-day blocked by owner");
            return Ok(Availability::Conflict(ConflictReason::MarkedUnavailable));
        }

        Ok(Availability::Admissible)
    }
}
