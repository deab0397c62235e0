use axum::{Json, extract::State};
use stockroom_model::HealthResponse;

use crate::infra::app_state::AppState;

/// GET /health
pub async fn health_handler(
    State(state): State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        entries: state.mirror().entry_count(),
    })
}
