use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use skyride_api::{
    app,
    auth::{CustomerClaims, JwtIdentityResolver},
    AppState,
};
use skyride_core::{CoreResult, FixedClock, Notification, NotificationSink, RideRules};
use skyride_store::Repositories;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

#[derive(Default)]
struct RecordingSink {
    queued: Mutex<Vec<Notification>>,
}

impl NotificationSink for RecordingSink {
    fn enqueue(&self, notification: Notification) -> CoreResult<()> {
        self.queued.lock().unwrap().push(notification);
        Ok(())
    }
}

fn test_app() -> (Router, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let state = AppState::new(
        Repositories::in_memory(),
        sink.clone(),
        JwtIdentityResolver::new(SECRET),
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())),
        RideRules::default(),
    );
    (app(state), sink)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn flight(number: &str, departure: &str, arrival: &str) -> Value {
    json!({
        "airline_name": "Fly Away",
        "flight_number": number,
        "departure": departure,
        "arrival": arrival,
        "available_seats": 2
    })
}

/// Registers a customer and mints the bearer token the identity provider
/// would hand out for them.
async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/users/register",
        None,
        Some(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "email": email
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "CUSTOMER");

    let claims = CustomerClaims {
        sub: body["id"].as_str().unwrap().to_string(),
        role: "CUSTOMER".to_string(),
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_flight_creation_errors() {
    let (app, _) = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/flights/create",
        None,
        Some(flight("FA123", "2030-01-01T10:00:00", "2030-01-01T12:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/flights/create",
        None,
        Some(flight("FA123", "2030-02-01T10:00:00", "2030-02-01T12:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = send(
        &app,
        Method::POST,
        "/flights/create",
        None,
        Some(flight("F1", "2030-01-01T10:00:00", "2030-01-01T12:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_booking_flow() {
    let (app, sink) = test_app();

    let (_, created) = send(
        &app,
        Method::POST,
        "/flights/create",
        None,
        Some(flight("FA200", "2030-01-01T10:00:00", "2030-01-01T12:00:00")),
    )
    .await;
    let flight_id = created["id"].as_str().unwrap().to_string();
    let (_, overlapping) = send(
        &app,
        Method::POST,
        "/flights/create",
        None,
        Some(flight("FA201", "2030-01-01T11:00:00", "2030-01-01T13:00:00")),
    )
    .await;
    let overlapping_id = overlapping["id"].as_str().unwrap().to_string();

    let token = register(&app, "jane@example.com").await;

    // no token
    let (status, _) = send(
        &app,
        Method::POST,
        "/flights/book",
        None,
        Some(json!({ "flight_id": flight_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, booked) = send(
        &app,
        Method::POST,
        "/flights/book",
        Some(&token),
        Some(json!({ "flight_id": flight_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let booking_id = booked["id"].as_str().unwrap().to_string();

    let (status, view) = send(
        &app,
        Method::GET,
        &format!("/flights/book/{}", booking_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["flight_number"], "FA200");
    assert_eq!(view["customer_first_name"], "Jane");

    let (status, body) = send(
        &app,
        Method::POST,
        "/flights/book",
        Some(&token),
        Some(json!({ "flight_id": overlapping_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "OVERLAP");

    assert_eq!(sink.queued.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_and_delete() {
    let (app, _) = test_app();
    for (number, day) in [("AA100", "01"), ("AA101", "02"), ("DL300", "03")] {
        send(
            &app,
            Method::POST,
            "/flights/create",
            None,
            Some(flight(
                number,
                &format!("2030-01-{}T10:00:00", day),
                &format!("2030-01-{}T12:00:00", day),
            )),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/flights/search?flight_number=aa&departure_from=2030-01-02T00:00:00",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["flight_number"], "AA101");

    let id = items[0]["id"].as_str().unwrap();
    let (status, _) = send(&app, Method::DELETE, &format!("/flights/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &format!("/flights/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ride_lifecycle() {
    let (app, sink) = test_app();

    let (status, passenger) = send(
        &app,
        Method::POST,
        "/passenger",
        None,
        Some(json!({
            "first_name": "Luis",
            "last_name": "Vega",
            "email": "luis@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(passenger["role"], "PASSENGER");
    let passenger_id = passenger["id"].as_str().unwrap().to_string();

    let (status, driver) = send(
        &app,
        Method::POST,
        "/driver",
        None,
        Some(json!({
            "first_name": "Ana",
            "last_name": "Ruiz",
            "email": "ana@example.com",
            "category": "XL",
            "vehicle": {
                "brand": "Toyota",
                "model": "Corolla",
                "license_plate": "ABC-123",
                "fabrication_year": 2020,
                "capacity": 4
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let driver_id = driver["id"].as_str().unwrap().to_string();

    let ride_body = json!({
        "passenger_id": passenger_id,
        "driver_id": driver_id,
        "origin_name": "Home",
        "destination_name": "Airport",
        "origin_coordinates": { "latitude": -12.1, "longitude": -77.0 },
        "destination_coordinates": { "latitude": -12.02, "longitude": -77.11 },
        "departure_date": "2030-01-01T10:00:00Z",
        "arrival_date": null,
        "price": 30.0
    });

    let (status, ride) = send(&app, Method::POST, "/ride", None, Some(ride_body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ride["status"], "REQUESTED");
    let ride_id = ride["id"].as_str().unwrap().to_string();
    assert_eq!(sink.queued.lock().unwrap()[0].recipient, "luis@example.com");

    let (status, ride) = send(
        &app,
        Method::PATCH,
        &format!("/ride/{}/assign/{}", ride_id, driver_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["status"], "ACCEPTED");

    let (_, ride) = send(
        &app,
        Method::PATCH,
        &format!("/ride/{}/complete", ride_id),
        None,
        None,
    )
    .await;
    assert_eq!(ride["status"], "COMPLETED");

    let (status, page) = send(
        &app,
        Method::GET,
        &format!("/ride/{}?page=0&size=5", passenger_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_elements"], 1);
    assert_eq!(page["content"][0]["id"], ride_id.as_str());

    // a second ride, cancelled before it starts
    let (_, other) = send(&app, Method::POST, "/ride", None, Some(ride_body.clone())).await;
    let other_id = other["id"].as_str().unwrap().to_string();
    let (_, cancelled) = send(&app, Method::PATCH, &format!("/ride/{}", other_id), None, None).await;
    assert_eq!(cancelled["status"], "CANCELLED");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/ride/{}/complete", other_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let mut same_place = ride_body;
    same_place["destination_coordinates"] = same_place["origin_coordinates"].clone();
    let (status, body) = send(&app, Method::POST, "/ride", None, Some(same_place)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    // rides outlive their passenger
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/passenger/{}", passenger_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/ride/{}", ride_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_driver_updates() {
    let (app, _) = test_app();
    let (_, driver) = send(
        &app,
        Method::POST,
        "/driver",
        None,
        Some(json!({
            "first_name": "Ana",
            "last_name": "Ruiz",
            "email": "ana@example.com",
            "category": "BLACK",
            "vehicle": {
                "brand": "Audi",
                "model": "A4",
                "license_plate": "LUX-001",
                "fabrication_year": 2022,
                "capacity": 4
            }
        })),
    )
    .await;
    let driver_id = driver["id"].as_str().unwrap().to_string();

    let (status, moved) = send(
        &app,
        Method::PATCH,
        &format!("/driver/{}/location", driver_id),
        None,
        Some(json!({ "latitude": -12.0, "longitude": -77.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["coordinate"]["latitude"], -12.0);

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/driver/{}/car", driver_id),
        None,
        Some(json!({
            "brand": "Audi",
            "model": "A6",
            "license_plate": "LUX-002",
            "fabrication_year": 2023,
            "capacity": 4
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["vehicle"]["model"], "A6");

    // a driver is not a passenger
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/passenger/{}", driver_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_removes_everything() {
    let (app, _) = test_app();
    send(
        &app,
        Method::POST,
        "/flights/create",
        None,
        Some(flight("FA300", "2030-01-01T10:00:00", "2030-01-01T12:00:00")),
    )
    .await;
    register(&app, "jane@example.com").await;

    let (status, _) = send(&app, Method::DELETE, "/cleanup", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, "/flights/search", None, None).await;
    assert!(body["items"].as_array().unwrap().is_empty());

    // the email is free again
    register(&app, "jane@example.com").await;
}
