use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Emitted once a booking transaction has committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub flight_number: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub booked_at: DateTime<Utc>,
}

/// Emitted once a ride has been persisted in REQUESTED state.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct RideCreatedEvent {
    pub ride_id: Uuid,
    pub destination_name: String,
    pub departure_date: DateTime<Utc>,
    pub price: f64,
}
