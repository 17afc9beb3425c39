//! venue-reserve/crates/vr-core/src/lib.rs
//!
//! Domain model, port traits and booking rules for the venue reservation
//! engine. Storage and transport live in other crates and plug in through
//! the traits defined here.

pub mod error;
pub mod models;
pub mod traits;

pub mod booking;
pub mod calendar;
pub mod conflict;
pub mod lifecycle;
pub mod validation;

// Re-exporting for easier access in other crates
pub use booking::BookingService;
pub use calendar::{DayCell, DayState, MonthGrid};
pub use conflict::Availability;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use validation::ReservationForm;
