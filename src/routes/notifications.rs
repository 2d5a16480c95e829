use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::errors::AppError;
use crate::models::Notification;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/unread", get(get_unread))
        .route("/mark-all-read", post(mark_all_read))
}

/// GET /api/notifications/unread
async fn get_unread(State(state): State<AppState>) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.service()?.unread_notifications()))
}

/// POST /api/notifications/mark-all-read
async fn mark_all_read(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let marked = state.service()?.mark_read()?;
    info!("Marked {} notifications as read", marked);
    Ok(StatusCode::NO_CONTENT)
}
