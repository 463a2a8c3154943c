use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chargesim_core::StationSnapshot;
use chargesim_engine::Engine;

use crate::simulation::ErrorResponse;

/// List every station as an owned snapshot
pub async fn list_stations(State(engine): State<Engine>) -> Json<Vec<StationSnapshot>> {
    tracing::info!("listing stations");
    Json(engine.stations())
}

/// Get one station by id
pub async fn get_station(
    State(engine): State<Engine>,
    Path(station_id): Path<u32>,
) -> impl IntoResponse {
    match engine.station(station_id) {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Station {station_id} not found"),
            }),
        )
            .into_response(),
    }
}
