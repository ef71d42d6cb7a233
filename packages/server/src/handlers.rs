//! HTTP handler functions for the retail sync API.

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use retail_sync::progress::null_progress;
use retail_sync_server_models::{
    ApiError, ApiGeocodeSyncResponse, ApiHealth, ApiIndexSyncResponse,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `OPTIONS` preflight for browser callers.
pub async fn preflight() -> HttpResponse {
    HttpResponse::NoContent()
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"))
        .finish()
}

/// `GET /api/algolia`
///
/// Syncs the inventory table into the search index. Failure details are
/// logged, not returned.
pub async fn index_sync(state: web::Data<AppState>) -> HttpResponse {
    match retail_sync::sync_index(&state.config, &null_progress()).await {
        Ok(summary) => HttpResponse::Ok().json(ApiIndexSyncResponse::from(summary)),
        Err(e) => {
            log::error!("Error processing data: {e}");
            internal_server_error()
        }
    }
}

/// `GET /api/geocode`
///
/// Geocodes retailers missing coordinates and writes them back.
pub async fn geocode_sync(state: web::Data<AppState>) -> HttpResponse {
    match retail_sync::sync_geocode(&state.config, &null_progress()).await {
        Ok(summary) => HttpResponse::Ok().json(ApiGeocodeSyncResponse::from(summary)),
        Err(e) => {
            log::error!("Error updating Airtable: {e}");
            HttpResponse::InternalServerError()
                .json(ApiError::new(format!("Error updating Airtable: {e}")))
        }
    }
}

/// `GET /api/map`
///
/// Returns the retailer locations as a `GeoJSON` `FeatureCollection`.
pub async fn map(state: web::Data<AppState>) -> HttpResponse {
    match retail_sync::sync_map(&state.config).await {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => {
            log::error!("Error building map feed: {e}");
            internal_server_error()
        }
    }
}

fn internal_server_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ApiError::new("Internal Server Error"))
}
