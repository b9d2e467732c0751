//! Booking and assignment rules.
//!
//! Every function here is pure: callers gather the state (fresh booking
//! counts, the customer's existing flight windows, the current instant) and
//! these functions only decide.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::flight::{parse_timestamp, Flight, FlightWindow, NewFlight};
use crate::user::{GeoPoint, NewUser};
use crate::{CoreError, CoreResult};

static FLIGHT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,3}[0-9]{3}$").unwrap());

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Flight cannot be oversold")]
    Oversold,
    #[error("Flight cannot be in the past")]
    Past,
    #[error("Flight cannot be in transit")]
    InTransit,
    #[error("Customer cannot book a flight that overlaps with another")]
    Overlap,
    #[error("Origin and destination coordinates cannot be the same")]
    SameOrigin,
    #[error("Flight number must be 2-3 uppercase letters followed by 3 digits")]
    Format,
    #[error("Departure time must be before arrival time")]
    Order,
    #[error("Available seats must be greater than 0")]
    Seats,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::Oversold => "OVERSOLD",
            Rejection::Past => "PAST",
            Rejection::InTransit => "IN_TRANSIT",
            Rejection::Overlap => "OVERLAP",
            Rejection::SameOrigin => "BAD_REQUEST",
            Rejection::Format => "FORMAT",
            Rejection::Order => "ORDER",
            Rejection::Seats => "SEATS",
        }
    }

    /// Malformed input as opposed to a business rule violated by valid input.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Rejection::Format | Rejection::Order | Rejection::Seats)
    }
}

// ============================================================================
// Flight rules
// ============================================================================

/// `current_booking_count` must be a fresh recount taken inside the same
/// unit of work that will insert the booking.
pub fn check_oversell(flight: &Flight, current_booking_count: i64) -> Result<(), Rejection> {
    if current_booking_count >= flight.available_seats as i64 {
        return Err(Rejection::Oversold);
    }
    Ok(())
}

/// The in-transit branch (`arrival < now < departure`) cannot hold for a
/// flight whose departure precedes its arrival. It stays for callers that
/// match on `InTransit`.
pub fn check_temporal_validity(flight: &Flight, now: DateTime<Utc>) -> Result<(), Rejection> {
    if flight.departure < now {
        return Err(Rejection::Past);
    }
    if flight.arrival < now && flight.departure > now {
        return Err(Rejection::InTransit);
    }
    Ok(())
}

/// Inclusive bounds: a flight arriving exactly when the candidate departs
/// still overlaps.
pub fn check_overlap(
    candidate: FlightWindow,
    existing: &[FlightWindow],
) -> Result<(), Rejection> {
    let overlaps = existing.iter().any(|window| {
        window.departure <= candidate.arrival && window.arrival >= candidate.departure
    });
    if overlaps {
        return Err(Rejection::Overlap);
    }
    Ok(())
}

pub fn validate_flight_number(number: &str) -> Result<(), Rejection> {
    if !FLIGHT_NUMBER.is_match(number) {
        return Err(Rejection::Format);
    }
    Ok(())
}

pub fn validate_flight_window(
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
) -> Result<(), Rejection> {
    if departure >= arrival {
        return Err(Rejection::Order);
    }
    Ok(())
}

pub fn validate_seats(seats: i32) -> Result<(), Rejection> {
    if seats <= 0 {
        return Err(Rejection::Seats);
    }
    Ok(())
}

/// Mandatory fields, number format, window order and capacity. Uniqueness of
/// the flight number needs the store and is checked by the caller.
pub fn validate_new_flight(input: &NewFlight) -> CoreResult<Flight> {
    let airline_name = mandatory(&input.airline_name, "Airline name")?;
    mandatory(&input.flight_number, "Flight number")?;
    // Checked as sent; surrounding whitespace is a format error
    let flight_number = input.flight_number.as_deref().unwrap_or_default();
    let departure_raw = mandatory(&input.departure, "Estimated departure time")?;
    let arrival_raw = mandatory(&input.arrival, "Estimated arrival time")?;
    let available_seats = input
        .available_seats
        .ok_or_else(|| CoreError::Validation("Available seats is mandatory".to_string()))?;

    validate_flight_number(flight_number)?;

    let departure = parse_timestamp("Estimated departure time", departure_raw)?;
    let arrival = parse_timestamp("Estimated arrival time", arrival_raw)?;
    validate_flight_window(departure, arrival)?;
    validate_seats(available_seats)?;

    Ok(Flight {
        id: uuid::Uuid::new_v4(),
        airline_name: airline_name.to_string(),
        flight_number: flight_number.to_string(),
        departure,
        arrival,
        available_seats,
    })
}

// ============================================================================
// Ride rules
// ============================================================================

/// Exact match on both latitude and longitude.
pub fn validate_coordinates_differ(origin: GeoPoint, destination: GeoPoint) -> Result<(), Rejection> {
    if origin.latitude == destination.latitude && origin.longitude == destination.longitude {
        return Err(Rejection::SameOrigin);
    }
    Ok(())
}

// ============================================================================
// User rules
// ============================================================================

pub fn validate_contact(input: &NewUser) -> CoreResult<()> {
    mandatory(&input.first_name, "First name")?;
    mandatory(&input.last_name, "Last name")?;
    let email = mandatory(&input.email, "Email")?;

    if !EMAIL.is_match(email) {
        return Err(CoreError::Validation(
            "Email must be a valid email address".to_string(),
        ));
    }
    Ok(())
}

/// Self-service registration additionally requires capitalised names.
pub fn validate_registration(input: &NewUser) -> CoreResult<()> {
    validate_contact(input)?;

    let has_upper = |s: &Option<String>| {
        s.as_deref()
            .map(|v| v.chars().any(|c| c.is_ascii_uppercase()))
            .unwrap_or(false)
    };
    if !has_upper(&input.first_name) {
        return Err(CoreError::Validation(
            "First name must contain at least 1 uppercase letter (A-Z)".to_string(),
        ));
    }
    if !has_upper(&input.last_name) {
        return Err(CoreError::Validation(
            "Last name must contain at least 1 uppercase letter (A-Z)".to_string(),
        ));
    }
    Ok(())
}

fn mandatory<'a>(value: &'a Option<String>, field: &str) -> CoreResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CoreError::Validation(format!("{} is mandatory", field))),
    }
}
