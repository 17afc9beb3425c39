//! # AppError
//!
//! Centralized error handling for the reservation engine.
//! Every failure is returned to the caller as one of these kinds; none of
//! them is fatal to the process.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::ReservationStatus;

/// The primary error type for all vr-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input, reported field by field.
    #[error("validation error: {0}")]
    ValidationError(ValidationErrors),

    /// The requested date cannot be booked.
    #[error("conflict: {0}")]
    Conflict(ConflictReason),

    /// Resource not found (e.g., Venue, Reservation)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The actor has no rights over the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Status change not permitted from the current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// Infrastructure failure (e.g., DB down, locked file)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }
}

/// A specialized Result type for engine logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a date was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Another pending or confirmed reservation holds the venue-day.
    AlreadyRequested,
    /// The owner blocked the date.
    MarkedUnavailable,
    /// The venue is closed for new reservations.
    VenueClosed,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyRequested => "date already requested or booked",
            Self::MarkedUnavailable => "date marked unavailable by owner",
            Self::VenueClosed => "venue is not accepting reservations",
        })
    }
}

/// One complaint about one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// The complete list of complaints gathered while validating a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a complaint. A field keeps only its first complaint.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if !self.has(field) {
            self.0.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}
