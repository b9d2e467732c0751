use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use skyride_core::BookingView;
use uuid::Uuid;

use crate::{auth::Customer, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct BookFlightRequest {
    pub flight_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights/book", post(book_flight))
        .route("/flights/book/{id}", get(get_booking))
}

async fn book_flight(
    State(state): State<AppState>,
    Customer(customer_id): Customer,
    Json(req): Json<BookFlightRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = state.bookings.book_flight(req.flight_id, customer_id).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(state.bookings.get_booking(id).await?))
}
