use std::sync::Arc;

use axum::{Router, http::StatusCode, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    middleware::{catch_panic_layer, json_error_middleware},
    state::AppState,
};

pub mod admin_users;
pub mod directory;
pub mod public;

pub const API_PREFIX: &str = "/api";

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(public::router())
        .merge(admin_users::router(state.clone()))
        .merge(directory::router(state));

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(|| async { StatusCode::NOT_FOUND })
}

/// The full service: routes plus tracing, panic capture and JSON error bodies.
pub fn app(state: Arc<AppState>) -> Router {
    router(state)
        .layer(middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
        .layer(TraceLayer::new_for_http())
}
