#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the retail sync jobs.
//!
//! Each job is triggered by a plain `GET` and runs to completion before the
//! response is sent:
//!
//! - `GET /api/algolia` runs the inventory index sync.
//! - `GET /api/geocode` runs the retailer geocode sync.
//! - `GET /api/map` returns the retailer `GeoJSON` feed.
//!
//! Browsers call these directly from the portal, so every response allows
//! any origin and `/api/algolia` and `/api/map` answer CORS preflights.

mod handlers;

use actix_web::http::{Method, header};
use actix_web::{App, HttpServer, middleware, web};
use retail_sync::config::SyncConfig;

/// Default bind address when `BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port when `PORT` is unset or invalid.
pub const DEFAULT_PORT: u16 = 8080;

/// Shared application state.
pub struct AppState {
    /// Service configuration, read once at startup.
    pub config: SyncConfig,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .service(
                web::resource("/algolia")
                    .route(web::get().to(handlers::index_sync))
                    .route(web::method(Method::OPTIONS).to(handlers::preflight)),
            )
            .service(web::resource("/geocode").route(web::get().to(handlers::geocode_sync)))
            .service(
                web::resource("/map")
                    .route(web::get().to(handlers::map))
                    .route(web::method(Method::OPTIONS).to(handlers::preflight)),
            ),
    );
}

/// Adds `Access-Control-Allow-Origin: *` to every response.
#[must_use]
pub fn allow_any_origin() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new().add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
}

/// Starts the retail sync API server.
///
/// Binds to `BIND_ADDR`:`PORT` (default `127.0.0.1:8080`). The caller is
/// responsible for initializing logging and providing the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: SyncConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState { config });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(allow_any_origin())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
