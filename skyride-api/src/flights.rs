use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use skyride_core::flight::parse_timestamp;
use skyride_core::{FlightSearch, NewFlight};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub flight_number: Option<String>,
    pub airline_name: Option<String>,
    pub departure_from: Option<String>,
    pub departure_to: Option<String>,
}

impl SearchParams {
    fn into_search(self) -> Result<FlightSearch, AppError> {
        let departure_from = self
            .departure_from
            .as_deref()
            .map(|raw| parse_timestamp("departure_from", raw))
            .transpose()?;
        let departure_to = self
            .departure_to
            .as_deref()
            .map(|raw| parse_timestamp("departure_to", raw))
            .transpose()?;

        Ok(FlightSearch {
            flight_number: self.flight_number,
            airline_name: self.airline_name,
            departure_from,
            departure_to,
        })
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights/create", post(create_flight))
        .route("/flights/create-many", post(create_flights))
        .route("/flights/search", get(search_flights))
        .route("/flights/{id}", delete(delete_flight))
}

async fn create_flight(
    State(state): State<AppState>,
    Json(input): Json<NewFlight>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = state.flights.create_flight(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Accepted straight away; items are validated and stored in the background.
async fn create_flights(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<NewFlight>>,
) -> (StatusCode, Json<Value>) {
    let count = inputs.len();
    // detached: the outcome is only logged
    let _ = state.flights.create_flights_async(inputs);
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": format!("Creating {} flights", count) })),
    )
}

async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let search = params.into_search()?;
    let items = state.flights.search_flights(&search).await?;
    Ok(Json(json!({ "items": items })))
}

async fn delete_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.flights.delete_flight(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
