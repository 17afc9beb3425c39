//! End-to-end behaviour of the booking service over a real SQLite store.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use vr_core::calendar::DayState;
use vr_core::validation::ReservationForm;
use vr_core::{
    Actor, AppError, AvailabilityStore, BookingService, Clock, ConflictReason, FixedClock, ReservationRepo,
    ReservationStatus, TransitionOutcome, Venue, VenueStatus,
};
use vr_db_sqlite::SqliteStore;

struct Fixture {
    store: SqliteStore,
    service: BookingService,
    venue: Venue,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn fixture() -> Fixture {
    let store = SqliteStore::in_memory().await.unwrap();
    let venue = Venue {
        id: Uuid::now_v7(),
        owner_id: Uuid::now_v7(),
        title: "Harbor Loft".into(),
        price_per_hour: Decimal::new(500, 0),
        status: VenueStatus::Open,
    };
    store.upsert_venue(&venue).await.unwrap();

    let service = service_with(&store, Arc::new(FixedClock::at(date(2025, 6, 15))));
    Fixture { store, service, venue }
}

fn service_with(store: &SqliteStore, clock: Arc<dyn Clock>) -> BookingService {
    let shared = Arc::new(store.clone());
    BookingService::new(shared.clone(), shared.clone(), shared, clock)
}

/// Advances one second on every `now()` call.
struct TickingClock {
    today: NaiveDate,
    seconds: AtomicI64,
}

impl Clock for TickingClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        let tick = self.seconds.fetch_add(1, Ordering::SeqCst);
        self.today.and_time(NaiveTime::MIN).and_utc() + Duration::seconds(tick)
    }
}

fn form(event_date: &str, start: &str, end: &str) -> ReservationForm {
    ReservationForm {
        event_date: event_date.into(),
        start_time: start.into(),
        end_time: end.into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_same_day_different_hours_then_accept_then_cancel() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);
    let r1 = Actor::renter(Uuid::now_v7());
    let r2 = Actor::renter(Uuid::now_v7());

    let id = fx
        .service
        .create_reservation(fx.venue.id, Some(r1.id), &form("2025-07-01", "09:00", "11:00"))
        .await
        .unwrap();
    let created = fx.service.reservation_for_renter(id, &r1).await.unwrap();
    assert_eq!(created.reservation.status, ReservationStatus::Pending);
    assert_eq!(created.venue_title, "Harbor Loft");

    let second = fx
        .service
        .create_reservation(fx.venue.id, Some(r2.id), &form("2025-07-01", "14:00", "16:00"))
        .await;
    assert!(matches!(
        second,
        Err(AppError::Conflict(ConflictReason::AlreadyRequested))
    ));

    let accepted = fx.service.accept(id, &owner).await.unwrap();
    assert_eq!(
        accepted,
        TransitionOutcome::Updated {
            from: ReservationStatus::Pending,
            to: ReservationStatus::Confirmed
        }
    );

    assert!(matches!(
        fx.service.cancel_own(id, &r1).await,
        Err(AppError::InvalidTransition { .. })
    ));
    let after = fx.service.reservation_for_owner(id, &owner).await.unwrap();
    assert_eq!(after.reservation.status, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn test_concurrent_requests_leave_one_active() {
    let fx = fixture().await;
    let service = Arc::new(fx.service);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        let venue_id = fx.venue.id;
        handles.push(tokio::spawn(async move {
            service
                .create_reservation(venue_id, Some(Uuid::now_v7()), &form("2025-08-09", "10:00", "12:00"))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(ConflictReason::AlreadyRequested)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(fx.store.count_active(fx.venue.id, date(2025, 8, 9)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rejected_day_can_be_requested_again() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);

    let first = fx
        .service
        .create_reservation(fx.venue.id, None, &form("2025-07-04", "09:00", "10:00"))
        .await
        .unwrap();
    fx.service.reject(first, &owner).await.unwrap();

    let second = fx
        .service
        .create_reservation(fx.venue.id, None, &form("2025-07-04", "18:00", "20:00"))
        .await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_override_cannot_double_activate_a_day() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);

    let first = fx
        .service
        .create_reservation(fx.venue.id, None, &form("2025-07-10", "09:00", "10:00"))
        .await
        .unwrap();
    fx.service
        .set_status(first, ReservationStatus::Cancelled, &owner)
        .await
        .unwrap();
    fx.service
        .create_reservation(fx.venue.id, None, &form("2025-07-10", "12:00", "13:00"))
        .await
        .unwrap();

    assert!(matches!(
        fx.service.set_status(first, ReservationStatus::Confirmed, &owner).await,
        Err(AppError::Conflict(ConflictReason::AlreadyRequested))
    ));
    assert_eq!(
        fx.service
            .set_status(first, ReservationStatus::Cancelled, &owner)
            .await
            .unwrap(),
        TransitionOutcome::Unchanged {
            status: ReservationStatus::Cancelled
        }
    );
}

#[tokio::test]
async fn test_stranger_cannot_touch_reservation() {
    let fx = fixture().await;
    let id = fx
        .service
        .create_reservation(fx.venue.id, None, &form("2025-07-11", "09:00", "10:00"))
        .await
        .unwrap();
    let stranger = Actor::owner(Uuid::now_v7());

    for result in [
        fx.service.accept(id, &stranger).await,
        fx.service.reject(id, &stranger).await,
        fx.service.set_status(id, ReservationStatus::Confirmed, &stranger).await,
    ] {
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
    let row = fx.store.find_summary(id).await.unwrap().unwrap();
    assert_eq!(row.reservation.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn test_blocked_and_closed_venues_refuse() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);

    assert!(fx
        .service
        .mark_unavailable(fx.venue.id, date(2025, 7, 20), &owner)
        .await
        .unwrap());
    assert!(matches!(
        fx.service
            .create_reservation(fx.venue.id, None, &form("2025-07-20", "09:00", "10:00"))
            .await,
        Err(AppError::Conflict(ConflictReason::MarkedUnavailable))
    ));

    let closed = Venue {
        status: VenueStatus::Closed,
        ..fx.venue.clone()
    };
    fx.store.upsert_venue(&closed).await.unwrap();
    assert!(matches!(
        fx.service
            .create_reservation(fx.venue.id, None, &form("2025-07-21", "09:00", "10:00"))
            .await,
        Err(AppError::Conflict(ConflictReason::VenueClosed))
    ));
}

#[tokio::test]
async fn test_store_guards_catch_stale_checks() {
    let fx = fixture().await;
    assert!(fx.store.mark_unavailable(fx.venue.id, date(2025, 9, 1)).await.unwrap());

    let reservation = vr_core::Reservation {
        id: Uuid::now_v7(),
        venue_id: fx.venue.id,
        renter_id: None,
        event_date: date(2025, 9, 1),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        status: ReservationStatus::Pending,
        contact: Default::default(),
        created_at: chrono::Utc::now(),
    };
    assert!(matches!(
        fx.store.insert_pending(&reservation).await,
        Err(AppError::Conflict(ConflictReason::MarkedUnavailable))
    ));

    let unknown = vr_core::Reservation {
        id: Uuid::now_v7(),
        venue_id: Uuid::now_v7(),
        event_date: date(2025, 9, 2),
        ..reservation
    };
    assert!(matches!(
        fx.store.insert_pending(&unknown).await,
        Err(AppError::NotFound(_, _))
    ));
}

#[tokio::test]
async fn test_listings_are_ordered_and_filtered() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);
    let renter = Uuid::now_v7();

    let mut ids = Vec::new();
    for day in ["2025-07-01", "2025-09-01", "2025-08-01"] {
        ids.push(
            fx.service
                .create_reservation(fx.venue.id, Some(renter), &form(day, "09:00", "10:00"))
                .await
                .unwrap(),
        );
    }
    fx.service.accept(ids[1], &owner).await.unwrap();

    let all = fx.service.list_for_owner(owner.id, None).await.unwrap();
    let dates: Vec<_> = all.iter().map(|r| r.reservation.event_date).collect();
    assert_eq!(dates, vec![date(2025, 9, 1), date(2025, 8, 1), date(2025, 7, 1)]);
    assert_eq!(all[0].renter_email(), "ada@example.com");

    let confirmed = fx.service.list_for_owner(owner.id, Some("confirmed")).await.unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].reservation.id, ids[1]);

    let unfiltered = fx.service.list_for_owner(owner.id, Some("bogus")).await.unwrap();
    assert_eq!(unfiltered.len(), 3);

    let mine = fx.service.list_for_renter(renter).await.unwrap();
    assert_eq!(mine.len(), 3);
    assert!(fx.service.list_for_renter(Uuid::now_v7()).await.unwrap().is_empty());

    assert_eq!(fx.service.owner_pending_count(owner.id).await.unwrap(), 2);
    let summary = fx.service.renter_summary(renter).await.unwrap();
    assert_eq!((summary.pending, summary.upcoming_confirmed, summary.total), (2, 1, 3));
}

#[tokio::test]
async fn test_same_day_lists_newest_request_first() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);
    let renter = Uuid::now_v7();
    let service = service_with(
        &fx.store,
        Arc::new(TickingClock {
            today: date(2025, 6, 15),
            seconds: AtomicI64::new(0),
        }),
    );

    let older = service
        .create_reservation(fx.venue.id, Some(renter), &form("2025-07-01", "09:00", "10:00"))
        .await
        .unwrap();
    service.reject(older, &owner).await.unwrap();
    let newer = service
        .create_reservation(fx.venue.id, Some(renter), &form("2025-07-01", "13:00", "14:00"))
        .await
        .unwrap();

    let owner_ids: Vec<_> = service
        .list_for_owner(owner.id, None)
        .await
        .unwrap()
        .iter()
        .map(|r| r.reservation.id)
        .collect();
    assert_eq!(owner_ids, vec![newer, older]);

    let renter_ids: Vec<_> = service
        .list_for_renter(renter)
        .await
        .unwrap()
        .iter()
        .map(|r| r.reservation.id)
        .collect();
    assert_eq!(renter_ids, vec![newer, older]);
}

#[tokio::test]
async fn test_closing_venue_keeps_existing_reservations_workable() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);
    let renter = Actor::renter(Uuid::now_v7());

    let to_accept = fx
        .service
        .create_reservation(fx.venue.id, Some(renter.id), &form("2025-07-01", "09:00", "10:00"))
        .await
        .unwrap();
    let to_cancel = fx
        .service
        .create_reservation(fx.venue.id, Some(renter.id), &form("2025-07-02", "09:00", "10:00"))
        .await
        .unwrap();

    let closed = Venue {
        status: VenueStatus::Closed,
        ..fx.venue.clone()
    };
    fx.store.upsert_venue(&closed).await.unwrap();

    assert!(matches!(
        fx.service
            .create_reservation(fx.venue.id, Some(renter.id), &form("2025-07-03", "09:00", "10:00"))
            .await,
        Err(AppError::Conflict(ConflictReason::VenueClosed))
    ));
    assert_eq!(
        fx.service.accept(to_accept, &owner).await.unwrap(),
        TransitionOutcome::Updated {
            from: ReservationStatus::Pending,
            to: ReservationStatus::Confirmed
        }
    );
    assert_eq!(
        fx.service.cancel_own(to_cancel, &renter).await.unwrap(),
        TransitionOutcome::Updated {
            from: ReservationStatus::Pending,
            to: ReservationStatus::Cancelled
        }
    );
}

#[tokio::test]
async fn test_past_event_dates_still_transition() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);
    let renter = Actor::renter(Uuid::now_v7());

    let to_accept = fx
        .service
        .create_reservation(fx.venue.id, Some(renter.id), &form("2025-07-01", "09:00", "10:00"))
        .await
        .unwrap();
    let to_cancel = fx
        .service
        .create_reservation(fx.venue.id, Some(renter.id), &form("2025-07-02", "09:00", "10:00"))
        .await
        .unwrap();

    // Both event dates are now behind "today".
    let later = service_with(&fx.store, Arc::new(FixedClock::at(date(2025, 9, 1))));
    assert!(matches!(
        later.accept(to_accept, &owner).await,
        Ok(TransitionOutcome::Updated { .. })
    ));
    assert!(matches!(
        later.cancel_own(to_cancel, &renter).await,
        Ok(TransitionOutcome::Updated { .. })
    ));
    let accepted = later.reservation_for_owner(to_accept, &owner).await.unwrap();
    assert_eq!(accepted.reservation.status, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn test_calendar_and_unavailable_management() {
    let fx = fixture().await;
    let owner = Actor::owner(fx.venue.owner_id);

    fx.service
        .replace_unavailable_dates(
            fx.venue.id,
            &BTreeSet::from([date(2025, 6, 20), date(2025, 6, 21), date(2025, 7, 2)]),
            &owner,
        )
        .await
        .unwrap();
    assert!(fx
        .service
        .clear_unavailable(fx.venue.id, date(2025, 6, 21), &owner)
        .await
        .unwrap());
    assert!(!fx
        .service
        .clear_unavailable(fx.venue.id, date(2025, 6, 21), &owner)
        .await
        .unwrap());
    fx.service
        .create_reservation(fx.venue.id, None, &form("2025-06-25", "09:00", "10:00"))
        .await
        .unwrap();

    let grid = fx
        .service
        .venue_calendar(fx.venue.id, 2025, 6, Some(date(2025, 6, 28)))
        .await
        .unwrap();
    assert_eq!(grid.cell(date(2025, 6, 10)).unwrap().state, DayState::Past);
    assert_eq!(grid.cell(date(2025, 6, 20)).unwrap().state, DayState::Unavailable);
    assert_eq!(grid.cell(date(2025, 6, 21)).unwrap().state, DayState::Available);
    assert_eq!(grid.cell(date(2025, 6, 25)).unwrap().state, DayState::Unavailable);
    assert_eq!(grid.cell(date(2025, 6, 28)).unwrap().state, DayState::Selected);

    assert!(matches!(
        fx.service
            .mark_unavailable(fx.venue.id, date(2025, 6, 30), &Actor::owner(Uuid::now_v7()))
            .await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        fx.service.venue_calendar(fx.venue.id, 2025, 13, None).await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_estimate_uses_venue_price() {
    let fx = fixture().await;
    let cost = fx
        .service
        .estimate_cost(
            fx.venue.id,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(cost, Decimal::new(1000, 0));
}
