//! Actor extraction.
//!
//! The engine never verifies credentials. The authentication collaborator in
//! front of this service resolves the session and forwards the account id and
//! role in `X-Actor-Id` / `X-Actor-Role`.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use uuid::Uuid;
use vr_core::models::{Actor, ActorRole};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// A request that must carry an actor. Rejected with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Actor);

/// A request that may carry an actor, e.g. a guest booking.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthenticated(pub Option<Actor>);

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn actor_from(req: &HttpRequest) -> Result<Option<Actor>, ApiError> {
    let (id, role) = match (header(req, ACTOR_ID_HEADER), header(req, ACTOR_ROLE_HEADER)) {
        (None, None) => return Ok(None),
        (Some(id), Some(role)) => (id, role),
        _ => {
            return Err(ApiError::Unauthenticated(
                "both actor id and role are required".to_string(),
            ))
        }
    };
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::Unauthenticated("malformed actor id".to_string()))?;
    let role = role
        .trim()
        .to_ascii_lowercase()
        .parse::<ActorRole>()
        .map_err(|e| ApiError::Unauthenticated(e.to_string()))?;
    Ok(Some(Actor { id, role }))
}

impl FromRequest for Authenticated {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(actor_from(req).and_then(|actor| {
            actor
                .map(Authenticated)
                .ok_or_else(|| ApiError::Unauthenticated("missing actor".to_string()))
        }))
    }
}

impl FromRequest for MaybeAuthenticated {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(actor_from(req).map(MaybeAuthenticated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_headers_resolve_to_actor() {
        let id = Uuid::now_v7();
        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, id.to_string()))
            .insert_header((ACTOR_ROLE_HEADER, "Owner"))
            .to_http_request();
        assert_eq!(actor_from(&req).unwrap(), Some(Actor::owner(id)));
    }

    #[test]
    fn test_absent_headers_mean_guest() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(actor_from(&req).unwrap(), None);
    }

    #[test]
    fn test_partial_or_bad_headers_rejected() {
        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, Uuid::now_v7().to_string()))
            .to_http_request();
        assert!(actor_from(&req).is_err());

        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, "not-a-uuid"))
            .insert_header((ACTOR_ROLE_HEADER, "renter"))
            .to_http_request();
        assert!(actor_from(&req).is_err());

        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, Uuid::now_v7().to_string()))
            .insert_header((ACTOR_ROLE_HEADER, "admin"))
            .to_http_request();
        assert!(actor_from(&req).is_err());
    }
}
