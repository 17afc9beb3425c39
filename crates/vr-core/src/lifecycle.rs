//! # Reservation Lifecycle Manager
//!
//! Owns the status rules and decides who may trigger each transition.
//!
//! Two separate paths coexist:
//! - the forward-only shortcuts (`accept`, `reject`, `cancel_own`), which only
//!   move a `pending` reservation;
//! - the owner override (`set_status`), which may write any status.
//!
//! Every call mutates at most one reservation, and every write is a
//! compare-and-set against the status last read.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{
    Actor, ActorRole, ReservationId, ReservationStatus, ReservationSummary, TransitionOutcome,
};
use crate::traits::ReservationRepo;

/// Whether the forward-only shortcuts may move `from` to `to`.
pub fn shortcut_allowed(from: ReservationStatus, to: ReservationStatus) -> bool {
    use ReservationStatus::*;
    matches!((from, to), (Pending, Confirmed) | (Pending, Rejected) | (Pending, Cancelled))
}

/// Override writes retried after losing a compare-and-set to another writer.
const OVERRIDE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct LifecycleManager {
    reservations: Arc<dyn ReservationRepo>,
}

impl LifecycleManager {
    pub fn new(reservations: Arc<dyn ReservationRepo>) -> Self {
        Self { reservations }
    }

    pub async fn accept(&self, id: ReservationId, actor: &Actor) -> Result<TransitionOutcome> {
        let summary = self.authorize_owner(id, actor).await?;
        self.shortcut(summary, ReservationStatus::Confirmed).await
    }

    pub async fn reject(&self, id: ReservationId, actor: &Actor) -> Result<TransitionOutcome> {
        let summary = self.authorize_owner(id, actor).await?;
        self.shortcut(summary, ReservationStatus::Rejected).await
    }

    /// Owner override: any status, regardless of the current one.
    pub async fn set_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
        actor: &Actor,
    ) -> Result<TransitionOutcome> {
        let summary = self.authorize_owner(id, actor).await?;
        let mut from = summary.reservation.status;

        // Each write is conditional on the status last read, so `from` is the
        // status actually replaced.
        for _ in 0..OVERRIDE_ATTEMPTS {
            if from == status {
                return Ok(TransitionOutcome::Unchanged { status });
            }
            if self.reservations.update_status_if(id, from, status).await? == 1 {
                info!(reservation_id = %id, %from, to = %status, owner_id = %actor.id, "owner override");
                return Ok(TransitionOutcome::Updated { from, to: status });
            }
            from = self.current_status(id).await?;
        }
        warn!(reservation_id = %id, "owner override kept losing to concurrent writers");
        Err(AppError::StoreUnavailable(
            "reservation status is changing concurrently; retry".to_string(),
        ))
    }

    /// Renter self-service cancellation of a `pending` reservation.
    pub async fn cancel_own(&self, id: ReservationId, actor: &Actor) -> Result<TransitionOutcome> {
        let summary = self
            .reservations
            .find_summary(id)
            .await?
            .ok_or_else(|| AppError::not_found("Reservation", id))?;

        if summary.reservation.renter_id != Some(actor.id) {
            warn!(reservation_id = %id, actor_id = %actor.id, "cancel attempt on another renter's reservation");
            return Err(AppError::Forbidden(
                "reservation does not belong to you".to_string(),
            ));
        }

        let from = summary.reservation.status;
        if from != ReservationStatus::Pending {
            return Err(AppError::InvalidTransition {
                from,
                to: ReservationStatus::Cancelled,
            });
        }

        self.compare_and_set(id, from, ReservationStatus::Cancelled).await
    }

    /// Resolves reservation → venue → owner and checks the actor against it.
    async fn authorize_owner(&self, id: ReservationId, actor: &Actor) -> Result<ReservationSummary> {
        let summary = self
            .reservations
            .find_summary(id)
            .await?
            .ok_or_else(|| AppError::not_found("Reservation", id))?;

        if actor.role != ActorRole::Owner || summary.venue_owner_id != actor.id {
            warn!(
                reservation_id = %id,
                actor_id = %actor.id,
                venue_id = %summary.reservation.venue_id,
                "status change attempted by non-owner"
            );
            return Err(AppError::Forbidden(
                "only the venue owner may change this reservation".to_string(),
            ));
        }
        Ok(summary)
    }

    async fn shortcut(
        &self,
        summary: ReservationSummary,
        to: ReservationStatus,
    ) -> Result<TransitionOutcome> {
        let from = summary.reservation.status;
        if from == to {
            return Ok(TransitionOutcome::Unchanged { status: to });
        }
        if !shortcut_allowed(from, to) {
            return Err(AppError::InvalidTransition { from, to });
        }
        self.compare_and_set(summary.reservation.id, from, to).await
    }

    async fn compare_and_set(
        &self,
        id: ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<TransitionOutcome> {
        if self.reservations.update_status_if(id, from, to).await? == 1 {
            info!(reservation_id = %id, %from, %to, "reservation status changed");
            return Ok(TransitionOutcome::Updated { from, to });
        }

        // Lost a race; report against whatever status won.
        let current = self.current_status(id).await?;
        if current == to {
            Ok(TransitionOutcome::Unchanged { status: to })
        } else {
            Err(AppError::InvalidTransition { from: current, to })
        }
    }

    async fn current_status(&self, id: ReservationId) -> Result<ReservationStatus> {
        Ok(self
            .reservations
            .find_summary(id)
            .await?
            .ok_or_else(|| AppError::not_found("Reservation", id))?
            .reservation
            .status)
    }
}
