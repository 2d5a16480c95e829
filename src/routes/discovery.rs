use axum::{extract::State, routing::{get, post}, Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::{CycleSummary, ServiceStatus, StockRecord};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/trigger", post(trigger_discovery))
        .route("/stocks", get(list_stocks))
}

/// GET /api/discovery/status
async fn get_status(State(state): State<AppState>) -> Result<Json<ServiceStatus>, AppError> {
    Ok(Json(state.service()?.status()))
}

/// POST /api/discovery/trigger - run one cycle now and wait for it
async fn trigger_discovery(State(state): State<AppState>) -> Result<Json<CycleSummary>, AppError> {
    info!("POST /api/discovery/trigger");
    let summary = state.service()?.trigger_now().await;
    Ok(Json(summary))
}

/// GET /api/discovery/stocks - every discovered listing
async fn list_stocks(State(state): State<AppState>) -> Result<Json<Vec<StockRecord>>, AppError> {
    Ok(Json(state.service()?.stocks()))
}
