use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chargesim_core::SimulationParameters;
use chargesim_engine::{Engine, EngineError, EngineStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub run_id: Uuid,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn engine_error_to_response(error: EngineError) -> impl IntoResponse {
    let status = match error {
        EngineError::AlreadyRunning | EngineError::NotInitialized => StatusCode::CONFLICT,
        EngineError::Config(_) => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Reset all simulation state from the supplied parameters
pub async fn initialize(
    State(engine): State<Engine>,
    Json(params): Json<SimulationParameters>,
) -> impl IntoResponse {
    match engine.initialize(params) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => engine_error_to_response(error).into_response(),
    }
}

/// Start the tick loop for the initialized simulation
pub async fn start(State(engine): State<Engine>) -> impl IntoResponse {
    match engine.start() {
        Ok(run_id) => (StatusCode::OK, Json(StartResponse { run_id })).into_response(),
        Err(error) => engine_error_to_response(error).into_response(),
    }
}

/// Request cooperative cancellation; always succeeds
pub async fn stop(State(engine): State<Engine>) -> StatusCode {
    engine.stop();
    StatusCode::NO_CONTENT
}

/// Lifecycle and virtual clock of the engine
pub async fn status(State(engine): State<Engine>) -> Json<EngineStatus> {
    Json(engine.status())
}
