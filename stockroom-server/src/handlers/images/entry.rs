use axum::{
    Json,
    extract::{Path, State},
};
use stockroom_model::CacheEntry;

use super::key_from_path;
use crate::infra::{app_state::AppState, errors::AppResult};

/// GET /api/v1/images/{sku}/{index}/entry - full entry snapshot.
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path((sku, index)): Path<(String, String)>,
) -> AppResult<Json<CacheEntry>> {
    let key = key_from_path(&sku, &index)?;
    Ok(Json(state.mirror().entry(&key)))
}
