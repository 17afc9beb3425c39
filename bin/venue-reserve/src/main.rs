//! # Venue-Reserve Binary
//!
//! The entry point that assembles the engine based on compile-time features:
//! configuration, logging, the storage plugin, and the HTTP adapter.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use secrecy::ExposeSecret;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vr_api::handlers::AppState;
use vr_api::middleware::{cors_policy, standard_middleware};
use vr_config::{EngineConfig, LogConfig};
use vr_core::{BookingService, SystemClock};

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use vr_db_sqlite::SqliteStore;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("venue-reserve needs a storage plugin; enable the `db-sqlite` feature");

fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .context("invalid log filter")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    // `try_init` also routes `log` records (actix's access log) into tracing.
    if log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let env_file = vr_config::load_env_file(None);
    let config = EngineConfig::load().context("loading configuration")?;
    init_tracing(&config.log)?;
    if let Some(path) = env_file {
        debug!(path = %path.display(), ".env loaded");
    }

    // 1. Initialize the shared store
    #[cfg(feature = "db-sqlite")]
    let store = {
        let store = SqliteStore::connect(
            config.database.url.expose_secret(),
            config.database.max_connections,
        )
        .await
        .context("opening database")?;
        store.migrate().await.context("applying migrations")?;
        Arc::new(store)
    };

    // 2. Wire the booking service (dynamic dispatch over the ports)
    let service = BookingService::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(SystemClock),
    );
    let state = web::Data::new(AppState { service });

    let bind = (config.http.host.clone(), config.http.port);
    info!(host = %bind.0, port = bind.1, "venue-reserve starting");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(cors_policy())
            .configure(vr_api::configure_routes)
    })
    .bind(bind)
    .context("binding http listener")?
    .run()
    .await
    .context("http server")
}
