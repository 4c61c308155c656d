#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the amenity map application.
//!
//! Exposes the amenity pipeline to the frontend: amenity lists around a
//! coordinate, a scored location profile, and forward/reverse geocoding
//! passed through to the search provider. No state is persisted; every
//! request queries the provider afresh.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use amenity_map_aggregate::AggregateOptions;
use amenity_map_provider::LocationProvider;
use amenity_map_provider::mapbox::MapboxClient;
use amenity_map_scoring::{Scorer, ScoringError, WeightTable};

/// Environment variable naming an optional TOML weight table file.
pub const WEIGHTS_PATH_ENV: &str = "SCORING_WEIGHTS";

/// Shared application state.
pub struct AppState {
    /// Search provider for POIs and geocoding.
    pub provider: Arc<dyn LocationProvider>,
    /// Radii, concurrency width and per-search timeout.
    pub options: AggregateOptions,
    /// Scorer for walking and driving scores.
    pub scorer: Scorer,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/amenities", web::get().to(handlers::amenities))
            .route("/profile", web::get().to(handlers::profile))
            .route("/geocode", web::get().to(handlers::geocode))
            .route("/reverse-geocode", web::get().to(handlers::reverse_geocode)),
    );
}

/// Builds the scorer from an optional TOML weight table, decaying driving
/// contributions over the same radius the driving pass searches.
///
/// # Errors
///
/// Returns [`ScoringError`] if the table is malformed or the radius is not
/// a positive distance.
pub fn build_scorer(
    weights_toml: Option<&str>,
    driving_radius_mi: f64,
) -> Result<Scorer, ScoringError> {
    let weights = match weights_toml {
        Some(s) => WeightTable::from_toml_str(s)?,
        None => WeightTable::canonical(),
    };
    Scorer::new(weights).with_driving_radius(driving_radius_mi)
}

/// Starts the amenity map API server.
///
/// Builds the Mapbox client from the environment (`MAPBOX_ACCESS_TOKEN`,
/// optionally `MAPBOX_BASE_URL`), loads `SCORING_WEIGHTS` if set, and serves
/// on `BIND_ADDR:PORT` (default `127.0.0.1:8080`). This is a regular async
/// function; the caller provides the runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the provider or scorer cannot be
/// configured, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Configuring search provider...");
    let client = MapboxClient::from_env().map_err(std::io::Error::other)?;
    let options = AggregateOptions::from_settings(client.settings());
    log::info!(
        "Using {} at {} ({} concurrent requests)",
        client.settings().name,
        client.settings().base_url,
        options.concurrent_requests
    );

    let weights_toml = match std::env::var(WEIGHTS_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            log::info!("Loading weight table from {path}");
            Some(std::fs::read_to_string(path.trim())?)
        }
        _ => None,
    };
    let scorer = build_scorer(weights_toml.as_deref(), options.driving_radius_mi)
        .map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState {
        provider: Arc::new(client),
        options,
        scorer,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
