use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::User;
use crate::{CoreError, CoreResult};

/// A scheduled flight with a fixed seat capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: Uuid,
    pub airline_name: String,
    pub flight_number: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub available_seats: i32,
}

impl Flight {
    pub fn window(&self) -> FlightWindow {
        FlightWindow {
            departure: self.departure,
            arrival: self.arrival,
        }
    }
}

/// Departure/arrival pair used by the overlap rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightWindow {
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
}

/// Unvalidated flight creation input. Every field is optional on the wire so
/// that a missing field surfaces as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFlight {
    pub airline_name: Option<String>,
    pub flight_number: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub available_seats: Option<i32>,
}

/// Filters for flight search. All filters are optional and combined with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightSearch {
    pub flight_number: Option<String>,
    pub airline_name: Option<String>,
    pub departure_from: Option<DateTime<Utc>>,
    pub departure_to: Option<DateTime<Utc>>,
}

impl FlightSearch {
    /// Case-insensitive substring match on number and airline, inclusive
    /// departure range.
    pub fn matches(&self, flight: &Flight) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle {
                Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
                None => true,
            }
        }

        contains(&flight.flight_number, &self.flight_number)
            && contains(&flight.airline_name, &self.airline_name)
            && self.departure_from.map_or(true, |from| flight.departure >= from)
            && self.departure_to.map_or(true, |to| flight.departure <= to)
    }
}

/// A seat reservation. Customer names are copied at booking time and never
/// re-derived from the user afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub customer_id: Uuid,
    pub booked_at: DateTime<Utc>,
    pub customer_first_name: String,
    pub customer_last_name: String,
}

impl Booking {
    pub fn snapshot(flight_id: Uuid, customer: &User, booked_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id,
            customer_id: customer.id,
            booked_at,
            customer_first_name: customer.first_name.clone(),
            customer_last_name: customer.last_name.clone(),
        }
    }
}

/// Read model returned by booking lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingView {
    pub id: Uuid,
    pub booked_at: DateTime<Utc>,
    pub flight_id: Uuid,
    pub flight_number: String,
    pub customer_id: Uuid,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
}

impl BookingView {
    pub fn new(booking: &Booking, flight: &Flight) -> Self {
        Self {
            id: booking.id,
            booked_at: booking.booked_at.trunc_subsecs(0),
            flight_id: flight.id,
            flight_number: flight.flight_number.clone(),
            customer_id: booking.customer_id,
            customer_first_name: booking.customer_first_name.clone(),
            customer_last_name: booking.customer_last_name.clone(),
            departure: flight.departure,
            arrival: flight.arrival,
        }
    }
}

/// Accepts RFC 3339 (`2024-05-01T10:00:00Z`) or a naive ISO-8601 timestamp
/// (`2024-05-01T10:00:00`), the latter read as UTC.
pub fn parse_timestamp(field: &str, raw: &str) -> CoreResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| CoreError::Validation(format!("{} must be an ISO-8601 date-time", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn flight(number: &str, airline: &str, hour: u32) -> Flight {
        Flight {
            id: Uuid::new_v4(),
            airline_name: airline.to_string(),
            flight_number: number.to_string(),
            departure: Utc.with_ymd_and_hms(2030, 1, 1, hour, 0, 0).unwrap(),
            arrival: Utc.with_ymd_and_hms(2030, 1, 1, hour + 2, 0, 0).unwrap(),
            available_seats: 10,
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("departure", "2020-01-01T00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("departure", "2020-01-01T00:00:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("departure", "2020-01-01T02:00:00+02:00").unwrap(),
            expected
        );
        assert!(matches!(
            parse_timestamp("departure", "yesterday"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_search_filters() {
        let f = flight("AA123", "American Airlines", 10);

        let by_number = FlightSearch {
            flight_number: Some("aa1".to_string()),
            ..Default::default()
        };
        assert!(by_number.matches(&f));

        let by_airline = FlightSearch {
            airline_name: Some("delta".to_string()),
            ..Default::default()
        };
        assert!(!by_airline.matches(&f));

        // Range bounds are inclusive
        let exact = FlightSearch {
            departure_from: Some(f.departure),
            departure_to: Some(f.departure),
            ..Default::default()
        };
        assert!(exact.matches(&f));
    }
}
