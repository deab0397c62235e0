use axum::{Json, extract::State, extract::rejection::JsonRejection};
use stockroom_model::{CacheKey, MaterializeRequest, MaterializeResponse};
use tracing::debug;

use crate::infra::{app_state::AppState, errors::AppResult};

/// POST /api/v1/images/materialize
///
/// Answers 200 whenever the key is valid; download failures are reported
/// in the body.
pub async fn post_materialize_handler(
    State(state): State<AppState>,
    payload: Result<Json<MaterializeRequest>, JsonRejection>,
) -> AppResult<Json<MaterializeResponse>> {
    let Json(MaterializeRequest { key, remote_url }) = payload?;
    let key = CacheKey::try_from(key)?;

    debug!(sku = key.sku(), index = key.index(), %remote_url, "materialize requested");
    Ok(Json(state.mirror().materialize(&key, &remote_url).await))
}
