//! venue-reserve/crates/vr-api/src/middleware.rs Middleware
//!
//! Request logging and CORS for the reservation API.

use actix_cors::Cors;
use actix_web::middleware::Logger;

use crate::actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

// Access log. Records go through the `log` facade, which the binary's
// tracing subscriber picks up.
pub fn standard_middleware() -> Logger {
    Logger::new("%a \"%r\" %s %b %Dms").exclude("/health")
}

// The presentation layer may be served from another origin.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, "content-type"])
        .max_age(3600)
}
