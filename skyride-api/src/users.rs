use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use skyride_core::{GeoPoint, NewUser, Role, User, Vehicle};
use skyride_rides::{NewDriver, NewPassenger};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register_customer))
        .route("/passenger", post(create_passenger))
        .route("/passenger/{id}", get(get_passenger).delete(delete_passenger))
        .route("/driver", post(create_driver))
        .route("/driver/{id}", get(get_driver).delete(delete_driver))
        .route("/driver/{id}/location", patch(update_driver_location))
        .route("/driver/{id}/car", patch(update_driver_vehicle))
}

/// Customers sign up here; their bearer tokens come from the identity provider.
async fn register_customer(
    State(state): State<AppState>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.users.register_customer(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn create_passenger(
    State(state): State<AppState>,
    Json(input): Json<NewPassenger>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.users.create_passenger(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_passenger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.get_user(id, Role::Passenger).await?))
}

async fn delete_passenger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.users.delete_user(id, Role::Passenger).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_driver(
    State(state): State<AppState>,
    Json(input): Json<NewDriver>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.users.create_driver(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.get_user(id, Role::Driver).await?))
}

async fn delete_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.users.delete_user(id, Role::Driver).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_driver_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(point): Json<GeoPoint>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.update_driver_location(id, point).await?))
}

async fn update_driver_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(vehicle): Json<Vehicle>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.update_driver_vehicle(id, vehicle).await?))
}
