use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::user::{Coordinate, GeoPoint};

/// Ride lifecycle: REQUESTED → ACCEPTED → (COMPLETED | CANCELLED)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Requested,
    Accepted,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Requested => "REQUESTED",
            RideStatus::Accepted => "ACCEPTED",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "REQUESTED" => Some(RideStatus::Requested),
            "ACCEPTED" => Some(RideStatus::Accepted),
            "COMPLETED" => Some(RideStatus::Completed),
            "CANCELLED" => Some(RideStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ride transition policy. Permissive by default: assign and cancel are
/// accepted from any state, terminal ones included.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RideRules {
    #[serde(default)]
    pub strict_transitions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ride {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub driver_id: Uuid,
    pub origin_name: String,
    pub destination_name: String,
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub departure_date: DateTime<Utc>,
    pub arrival_date: Option<DateTime<Utc>>,
    pub price: f64,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
}

impl Ride {
    /// Build a freshly requested ride from resolved coordinates.
    pub fn requested(
        input: &NewRide,
        origin: Coordinate,
        destination: Coordinate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            passenger_id: input.passenger_id,
            driver_id: input.driver_id,
            origin_name: input.origin_name.clone(),
            destination_name: input.destination_name.clone(),
            origin,
            destination,
            departure_date: input.departure_date,
            arrival_date: input.arrival_date,
            price: input.price,
            status: RideStatus::Requested,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRide {
    pub passenger_id: Uuid,
    pub driver_id: Uuid,
    pub origin_name: String,
    pub destination_name: String,
    pub origin_coordinates: GeoPoint,
    pub destination_coordinates: GeoPoint,
    pub departure_date: DateTime<Utc>,
    pub arrival_date: Option<DateTime<Utc>>,
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RideStatus::Requested.is_terminal());
        assert!(!RideStatus::Accepted.is_terminal());
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_text_matches_wire_format() {
        for status in [
            RideStatus::Requested,
            RideStatus::Accepted,
            RideStatus::Completed,
            RideStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(RideStatus::parse(status.as_str()), Some(status));
        }
    }
}
