use axum::{
    Router,
    routing::{get, post},
};
use stockroom_model::routes::v1::images;

use crate::{AppState, handlers::images as image_handlers};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            images::MATERIALIZE,
            post(image_handlers::post_materialize_handler),
        )
        .route(images::EXISTS, get(image_handlers::get_exists_handler))
        .route(images::ENTRY, get(image_handlers::get_entry_handler))
        .route(images::BLOB, get(image_handlers::get_image_blob_handler))
}
