use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{discovery, health, notifications};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/discovery", discovery::router())
        .nest("/api/notifications", notifications::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
