use axum::{Json, extract::State};
use chargesim_core::{StatisticsSnapshot, SystemMetrics, Vehicle};
use chargesim_engine::Engine;

/// List every active vehicle: charging and queued, across all stations
pub async fn list_vehicles(State(engine): State<Engine>) -> Json<Vec<Vehicle>> {
    Json(engine.active_vehicles())
}

/// Facility-wide totals
pub async fn get_metrics(State(engine): State<Engine>) -> Json<SystemMetrics> {
    Json(engine.metrics().unwrap_or_default())
}

/// Aggregated run statistics
pub async fn get_statistics(State(engine): State<Engine>) -> Json<StatisticsSnapshot> {
    Json(
        engine
            .statistics()
            .unwrap_or_else(|| chargesim_core::Statistics::new().snapshot()),
    )
}
