use axum::{
    Json,
    extract::{Path, State},
};
use stockroom_model::ExistsResponse;

use super::key_from_path;
use crate::infra::{app_state::AppState, errors::AppResult};

/// GET /api/v1/images/{sku}/{index}/exists - registry lookup, never fetches.
pub async fn get_exists_handler(
    State(state): State<AppState>,
    Path((sku, index)): Path<(String, String)>,
) -> AppResult<Json<ExistsResponse>> {
    let key = key_from_path(&sku, &index)?;
    Ok(Json(state.mirror().check_exists(&key)))
}
