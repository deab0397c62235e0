//! # Stockroom Server
//!
//! HTTP surface of the Stockroom image mirror: existence checks,
//! materialization requests and blob serving for locally mirrored product
//! photos.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::{Router, routing::get};
use stockroom_model::routes::HEALTH;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(HEALTH, get(handlers::health::health_handler))
        .merge(routes::create_api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
