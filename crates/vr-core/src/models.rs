//! # Domain Models
//!
//! These structs represent the core entities of the reservation engine.
//! We use UUID v7 for time-ordered, globally unique identification.
//! Dates and times are naive local values; no timezone normalization happens.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VenueId = Uuid;
pub type ReservationId = Uuid;
/// An account resolved by the authentication collaborator.
pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueStatus {
    Open,
    Closed,
}

impl VenueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for VenueStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A bookable space, as seen through the venue collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub owner_id: AccountId,
    pub title: String,
    pub price_per_hour: Decimal,
    pub status: VenueStatus,
}

impl Venue {
    pub fn accepts_reservations(&self) -> bool {
        self.status == VenueStatus::Open
    }
}

/// Reservation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Confirmed, Self::Rejected, Self::Cancelled];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Active reservations count toward the one-per-venue-day rule.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Renter contact details captured at creation time and never re-validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile_country_code: Option<String>,
    pub mobile_number: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub voucher_code: Option<String>,
}

impl ContactInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub venue_id: VenueId,
    /// Anonymous bookings carry no renter.
    pub renter_id: Option<AccountId>,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: ReservationStatus,
    pub contact: ContactInfo,
    pub created_at: DateTime<Utc>,
}

/// A reservation joined with its venue, as listed to owners and renters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSummary {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub venue_title: String,
    pub venue_owner_id: AccountId,
}

impl ReservationSummary {
    pub fn renter_name(&self) -> String {
        self.reservation.contact.full_name()
    }

    pub fn renter_email(&self) -> &str {
        &self.reservation.contact.email
    }
}

/// Role asserted by the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Lists venues and manages their reservations.
    Owner,
    /// Books venues.
    Renter,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for ActorRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "renter" => Ok(Self::Renter),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// The trusted caller of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: AccountId,
    pub role: ActorRole,
}

impl Actor {
    pub fn owner(id: AccountId) -> Self {
        Self { id, role: ActorRole::Owner }
    }

    pub fn renter(id: AccountId) -> Self {
        Self { id, role: ActorRole::Renter }
    }
}

/// Result of a status change that passed its checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    Updated {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    /// The reservation already had the requested status; zero rows changed.
    Unchanged { status: ReservationStatus },
}

/// Dashboard counters for a renter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenterSummary {
    pub pending: usize,
    pub upcoming_confirmed: usize,
    pub total: usize,
}
