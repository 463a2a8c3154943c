//! Charging facility simulation API
//!
//! This library provides the HTTP surface over the simulation engine:
//! lifecycle commands, station and vehicle queries, and run statistics.

mod simulation;
mod station;
mod vehicles;

use axum::{
    Router,
    routing::{get, post},
};
use chargesim_engine::Engine;
use tower_http::trace::TraceLayer;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the application router with all endpoints
pub fn create_app(engine: Engine) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/simulation", get(simulation::status))
        .route("/simulation/initialize", post(simulation::initialize))
        .route("/simulation/start", post(simulation::start))
        .route("/simulation/stop", post(simulation::stop))
        .route("/stations", get(station::list_stations))
        .route("/stations/{station_id}", get(station::get_station))
        .route("/vehicles", get(vehicles::list_vehicles))
        .route("/statistics", get(vehicles::get_statistics))
        .route("/metrics", get(vehicles::get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}
