use axum::{extract::State, routing::get, Router};
use tracing::debug;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// Always 200 so the process is considered alive; the body tells whether
/// the discovery service came up.
async fn health(State(state): State<AppState>) -> &'static str {
    debug!("GET /health - Health check");
    if state.discovery.is_some() {
        "OK"
    } else {
        "DEGRADED"
    }
}
