//! # vr-api
//!
//! The JSON routing layer in front of the booking service. Identity comes
//! from the upstream authentication collaborator through trusted headers;
//! see [`actor`].

pub mod actor;
pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

use crate::error::ApiError;

/// Configures the routes for the reservation engine.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).app_data(query_config()).app_data(path_config());
    cfg.service(
        web::scope("")
            .route("/health", web::get().to(handlers::health))
            // Renter-facing venue views and booking
            .route("/venues/{venue_id}/reservations", web::post().to(handlers::create_reservation))
            .route("/venues/{venue_id}/availability", web::get().to(handlers::check_availability))
            .route("/venues/{venue_id}/calendar", web::get().to(handlers::venue_calendar))
            .route("/venues/{venue_id}/estimate", web::get().to(handlers::estimate_cost))
            // Owner availability management
            .route("/venues/{venue_id}/unavailable-dates", web::put().to(handlers::replace_unavailable))
            .route("/venues/{venue_id}/unavailable-dates/{date}", web::put().to(handlers::mark_unavailable))
            .route("/venues/{venue_id}/unavailable-dates/{date}", web::delete().to(handlers::clear_unavailable))
            // Owner dashboard
            .route("/owner/reservations", web::get().to(handlers::owner_reservations))
            .route("/owner/reservations/pending-count", web::get().to(handlers::owner_pending_count))
            .route("/owner/reservations/{id}", web::get().to(handlers::owner_reservation))
            .route("/owner/reservations/{id}/accept", web::post().to(handlers::accept))
            .route("/owner/reservations/{id}/reject", web::post().to(handlers::reject))
            .route("/owner/reservations/{id}/status", web::put().to(handlers::set_status))
            // Renter dashboard
            .route("/renter/reservations", web::get().to(handlers::renter_reservations))
            .route("/renter/summary", web::get().to(handlers::renter_summary))
            .route("/renter/reservations/{id}", web::get().to(handlers::renter_reservation))
            .route("/renter/reservations/{id}/cancel", web::post().to(handlers::cancel_own)),
    );
}

// Malformed bodies, queries and paths answer with the same JSON error shape
// as engine errors.

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}
