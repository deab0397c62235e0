use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::warn;

use super::key_from_path;
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

const BLOB_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// GET /api/v1/images/{sku}/{index} - bytes of a materialized image.
pub async fn get_image_blob_handler(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((sku, index)): Path<(String, String)>,
) -> AppResult<Response> {
    let key = key_from_path(&sku, &index)?;
    let Some(image) = state.mirror().ready_image(&key) else {
        return Err(AppError::not_found(format!("{key} is not materialized")));
    };

    let etag = format!("\"{}\"", image.sha256);

    if let Some(if_none_match) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        && if_none_match
            .split(',')
            .any(|t| t.trim() == etag || t.trim() == "*")
    {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [
                (header::ETAG, etag),
                (header::CACHE_CONTROL, BLOB_CACHE_CONTROL.to_string()),
            ],
        )
            .into_response());
    }

    let file = match tokio::fs::File::open(&image.local_path).await {
        Ok(file) => file,
        Err(err) => {
            warn!(%key, path = %image.local_path.display(), error = %err, "ready blob unreadable");
            return Err(AppError::not_found(format!("{key} is not materialized")));
        }
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CONTENT_LENGTH, image.byte_len.to_string()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, BLOB_CACHE_CONTROL.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
