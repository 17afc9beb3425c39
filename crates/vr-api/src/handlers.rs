//! # vr-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the booking
//! service. Handlers parse path and query values, resolve the actor, call one
//! service operation and serialize its result.

use std::collections::BTreeSet;

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use vr_core::error::{AppError, ValidationErrors};
use vr_core::models::{ActorRole, ReservationStatus};
use vr_core::validation::{parse_date, parse_time, ReservationForm};
use vr_core::BookingService;

use crate::actor::{Authenticated, MaybeAuthenticated};
use crate::error::ApiError;

type ApiResult = Result<HttpResponse, ApiError>;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub service: BookingService,
}

fn date_field(field: &'static str, raw: &str) -> Result<NaiveDate, ApiError> {
    parse_date(raw).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.add(field, "Date must be a valid date (YYYY-MM-DD).");
        ApiError::App(AppError::ValidationError(errors))
    })
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Books a venue-day. Guests may book without an actor; a renter actor is
/// recorded as the reservation's owner.
pub async fn create_reservation(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: MaybeAuthenticated,
    form: web::Json<ReservationForm>,
) -> ApiResult {
    let renter_id = actor
        .0
        .filter(|a| a.role == ActorRole::Renter)
        .map(|a| a.id);
    let id = data
        .service
        .create_reservation(path.into_inner(), renter_id, &form)
        .await?;
    Ok(HttpResponse::Created().json(json!({
        "id": id,
        "status": ReservationStatus::Pending,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: String,
}

pub async fn check_availability(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<DateQuery>,
) -> ApiResult {
    let date = date_field("date", &query.date)?;
    let availability = data.service.check_availability(path.into_inner(), date).await?;
    Ok(HttpResponse::Ok().json(availability))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
    pub selected: Option<String>,
}

pub async fn venue_calendar(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<CalendarQuery>,
) -> ApiResult {
    let selected = query
        .selected
        .as_deref()
        .map(|raw| date_field("selected", raw))
        .transpose()?;
    let grid = data
        .service
        .venue_calendar(path.into_inner(), query.year, query.month, selected)
        .await?;
    let (prev_year, prev_month) = grid.previous_month();
    let (next_year, next_month) = grid.next_month();
    Ok(HttpResponse::Ok().json(json!({
        "calendar": grid,
        "previous": { "year": prev_year, "month": prev_month },
        "next": { "year": next_year, "month": next_month },
    })))
}

#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    pub start_time: String,
    pub end_time: String,
}

pub async fn estimate_cost(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<EstimateQuery>,
) -> ApiResult {
    let mut errors = ValidationErrors::new();
    let start = parse_time(&query.start_time);
    if start.is_none() {
        errors.add("start_time", "Start time must be a valid time (HH:MM).");
    }
    let end = parse_time(&query.end_time);
    if end.is_none() {
        errors.add("end_time", "End time must be a valid time (HH:MM).");
    }
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AppError::ValidationError(errors).into());
    };

    let total = data.service.estimate_cost(path.into_inner(), start, end).await?;
    Ok(HttpResponse::Ok().json(json!({ "total": total })))
}

#[derive(Debug, Deserialize)]
pub struct UnavailableDates {
    pub dates: Vec<String>,
}

pub async fn replace_unavailable(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: Authenticated,
    body: web::Json<UnavailableDates>,
) -> ApiResult {
    let dates = body
        .dates
        .iter()
        .map(|raw| date_field("dates", raw))
        .collect::<Result<BTreeSet<_>, _>>()?;
    data.service
        .replace_unavailable_dates(path.into_inner(), &dates, &actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "dates": dates })))
}

pub async fn mark_unavailable(
    data: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
    actor: Authenticated,
) -> ApiResult {
    let (venue_id, raw) = path.into_inner();
    let date = date_field("date", &raw)?;
    let added = data.service.mark_unavailable(venue_id, date, &actor.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "date": date, "changed": added })))
}

pub async fn clear_unavailable(
    data: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
    actor: Authenticated,
) -> ApiResult {
    let (venue_id, raw) = path.into_inner();
    let date = date_field("date", &raw)?;
    let removed = data.service.clear_unavailable(venue_id, date, &actor.0).await?;
    Ok(HttpResponse::Ok().json(json!({ "date": date, "changed": removed })))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

pub async fn owner_reservations(
    data: web::Data<AppState>,
    actor: Authenticated,
    query: web::Query<StatusQuery>,
) -> ApiResult {
    let rows = data
        .service
        .list_for_owner(actor.0.id, query.status.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn owner_pending_count(data: web::Data<AppState>, actor: Authenticated) -> ApiResult {
    let pending = data.service.owner_pending_count(actor.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "pending": pending })))
}

pub async fn owner_reservation(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: Authenticated,
) -> ApiResult {
    let row = data
        .service
        .reservation_for_owner(path.into_inner(), &actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(row))
}

pub async fn accept(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: Authenticated,
) -> ApiResult {
    let outcome = data.service.accept(path.into_inner(), &actor.0).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn reject(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: Authenticated,
) -> ApiResult {
    let outcome = data.service.reject(path.into_inner(), &actor.0).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// Owner override. Unlike the list filter, an unknown status here is an error.
pub async fn set_status(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: Authenticated,
    body: web::Json<StatusBody>,
) -> ApiResult {
    let status = body.status.trim().parse::<ReservationStatus>().map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.add(
            "status",
            "Status must be one of pending, confirmed, rejected, cancelled.",
        );
        ApiError::App(AppError::ValidationError(errors))
    })?;
    let outcome = data
        .service
        .set_status(path.into_inner(), status, &actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn renter_reservations(data: web::Data<AppState>, actor: Authenticated) -> ApiResult {
    let rows = data.service.list_for_renter(actor.0.id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn renter_summary(data: web::Data<AppState>, actor: Authenticated) -> ApiResult {
    let summary = data.service.renter_summary(actor.0.id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn renter_reservation(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: Authenticated,
) -> ApiResult {
    let row = data
        .service
        .reservation_for_renter(path.into_inner(), &actor.0)
        .await?;
    Ok(HttpResponse::Ok().json(row))
}

pub async fn cancel_own(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    actor: Authenticated,
) -> ApiResult {
    let outcome = data.service.cancel_own(path.into_inner(), &actor.0).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
