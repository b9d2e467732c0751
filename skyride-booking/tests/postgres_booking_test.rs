//! Booking races against a real Postgres.
//!
//! Set `DATABASE_URL` to a disposable database to run these; without it the
//! tests return early.

use chrono::{DateTime, Duration, Utc};
use skyride_booking::BookingService;
use skyride_core::{
    CoreError, CoreResult, Flight, FlightSearch, NewUser, Notification, NotificationSink, Rejection,
    SystemClock, User, UserKind,
};
use skyride_core::repository::{BookingRepository, FlightRepository, UserRepository};
use skyride_store::app_config::DatabaseConfig;
use skyride_store::{DbClient, Repositories};
use std::sync::Arc;
use uuid::Uuid;

struct DiscardSink;

impl NotificationSink for DiscardSink {
    fn enqueue(&self, _notification: Notification) -> CoreResult<()> {
        Ok(())
    }
}

async fn connect() -> Option<Repositories> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url: Some(url.clone()),
        max_connections: 10,
        acquire_timeout_secs: 5,
    };
    let db = DbClient::new(&url, &config).await.unwrap();
    db.migrate().await.unwrap();
    Some(Repositories::postgres(&db))
}

async fn add_flight(
    repos: &Repositories,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
    seats: i32,
) -> Uuid {
    let flight = Flight {
        id: Uuid::new_v4(),
        airline_name: "Fly Away".to_string(),
        flight_number: format!("PG{}", &Uuid::new_v4().simple().to_string()[..8]),
        departure,
        arrival,
        available_seats: seats,
    };
    repos.flights.insert_flight(&flight).await.unwrap();
    flight.id
}

async fn add_customer(repos: &Repositories) -> Uuid {
    let user = User::new(
        NewUser {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            email: Some(format!("{}@example.com", Uuid::new_v4().simple())),
            phone_number: None,
        },
        UserKind::Customer,
        Utc::now(),
    );
    repos.users.insert_user(&user).await.unwrap();
    user.id
}

fn service(repos: &Repositories) -> BookingService {
    BookingService::new(
        repos.bookings.clone(),
        Arc::new(DiscardSink),
        Arc::new(SystemClock),
    )
}

#[tokio::test]
async fn test_customer_cannot_hold_overlapping_flights_under_concurrency() {
    let Some(repos) = connect().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let service = service(&repos);

    for _ in 0..20 {
        let base = Utc::now() + Duration::days(30);
        let morning = add_flight(&repos, base, base + Duration::hours(2), 10).await;
        let midday = add_flight(
            &repos,
            base + Duration::hours(1),
            base + Duration::hours(3),
            10,
        )
        .await;
        let customer_id = add_customer(&repos).await;

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.book_flight(morning, customer_id).await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            async move { service.book_flight(midday, customer_id).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(CoreError::Rejected(Rejection::Overlap)))));
    }
}

#[tokio::test]
async fn test_last_seat_goes_to_one_customer() {
    let Some(repos) = connect().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let service = service(&repos);

    let base = Utc::now() + Duration::days(30);
    let flight_id = add_flight(&repos, base, base + Duration::hours(2), 1).await;
    let mut customers = Vec::new();
    for _ in 0..8 {
        customers.push(add_customer(&repos).await);
    }

    let handles: Vec<_> = customers
        .into_iter()
        .map(|customer_id| {
            let service = service.clone();
            tokio::spawn(async move { service.book_flight(flight_id, customer_id).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert!(matches!(e, CoreError::Rejected(Rejection::Oversold))),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(repos.bookings.count_for_flight(flight_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_search_matches_wildcard_characters_literally() {
    let Some(repos) = connect().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let base = Utc::now() + Duration::days(30);
    let flight_id = add_flight(&repos, base, base + Duration::hours(2), 5).await;

    let search = |number: &str| FlightSearch {
        flight_number: Some(number.to_string()),
        departure_from: Some(base - Duration::minutes(1)),
        departure_to: Some(base + Duration::minutes(1)),
        ..FlightSearch::default()
    };

    let found = repos.flights.search_flights(&search("pg")).await.unwrap();
    assert!(found.iter().any(|f| f.id == flight_id));

    for wildcard in ["%", "_", "PG%"] {
        let found = repos.flights.search_flights(&search(wildcard)).await.unwrap();
        assert!(found.iter().all(|f| f.id != flight_id));
    }
}
