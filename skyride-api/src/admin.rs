use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cleanup", delete(cleanup))
        .route("/health", get(health))
}

/// Removes every booking, ride, flight and user.
async fn cleanup(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.repositories.purge().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
