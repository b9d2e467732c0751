use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use skyride_core::{NewRide, Page, PageRequest, Ride};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    PageRequest::DEFAULT_SIZE
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ride", post(create_ride))
        // GET lists a passenger's rides, PATCH cancels a ride
        .route("/ride/{id}", get(passenger_rides).patch(cancel_ride))
        .route("/ride/{id}/assign/{driver_id}", patch(assign_driver))
        .route("/ride/{id}/complete", patch(complete_ride))
}

async fn create_ride(
    State(state): State<AppState>,
    Json(input): Json<NewRide>,
) -> Result<(StatusCode, Json<Ride>), AppError> {
    let ride = state.rides.create_ride(input).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

async fn assign_driver(
    State(state): State<AppState>,
    Path((id, driver_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.rides.assign_driver(id, driver_id).await?))
}

async fn cancel_ride(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.rides.cancel_ride(id).await?))
}

async fn complete_ride(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(state.rides.complete_ride(id).await?))
}

async fn passenger_rides(
    State(state): State<AppState>,
    Path(passenger_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Ride>>, AppError> {
    let page = PageRequest::new(params.page, params.size);
    Ok(Json(state.rides.passenger_rides(passenger_id, page).await?))
}
