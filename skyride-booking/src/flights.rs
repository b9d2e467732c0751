use serde::Serialize;
use skyride_core::repository::FlightRepository;
use skyride_core::validation::validate_new_flight;
use skyride_core::{CoreError, CoreResult, Flight, FlightSearch, NewFlight};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-item tally of a bulk creation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub created: usize,
    pub failed: usize,
}

/// Flight catalogue management: creation, search and removal.
#[derive(Clone)]
pub struct FlightService {
    flights: Arc<dyn FlightRepository>,
}

impl FlightService {
    pub fn new(flights: Arc<dyn FlightRepository>) -> Self {
        Self { flights }
    }

    pub async fn create_flight(&self, input: NewFlight) -> CoreResult<Uuid> {
        // 1. Shape, format, window and capacity
        let flight = validate_new_flight(&input)?;

        // 2. Uniqueness (the store enforces it too)
        if self
            .flights
            .exists_by_flight_number(&flight.flight_number)
            .await?
        {
            return Err(CoreError::Conflict(
                "Flight number cannot be repeated".to_string(),
            ));
        }

        // 3. Persist
        self.flights.insert_flight(&flight).await?;
        info!(
            flight_id = %flight.id,
            flight_number = %flight.flight_number,
            "Flight created"
        );
        Ok(flight.id)
    }

    /// Validates and stores every item independently on a background task.
    /// A bad item is logged and skipped; nothing already stored is undone.
    pub fn create_flights_async(&self, inputs: Vec<NewFlight>) -> JoinHandle<BulkOutcome> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut outcome = BulkOutcome::default();
            for (index, input) in inputs.into_iter().enumerate() {
                match service.create_flight(input).await {
                    Ok(_) => outcome.created += 1,
                    Err(e) => {
                        warn!(index, "Skipping flight in bulk creation: {}", e);
                        outcome.failed += 1;
                    }
                }
            }
            info!(
                created = outcome.created,
                failed = outcome.failed,
                "Bulk flight creation finished"
            );
            outcome
        })
    }

    pub async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<Flight>> {
        self.flights.search_flights(search).await
    }

    /// Bookings on the flight go with it.
    pub async fn delete_flight(&self, id: Uuid) -> CoreResult<()> {
        if !self.flights.delete_flight(id).await? {
            return Err(CoreError::not_found("Flight", id));
        }
        info!(flight_id = %id, "Flight deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyride_core::Rejection;
    use skyride_store::MemoryStore;

    fn new_flight(number: &str) -> NewFlight {
        NewFlight {
            airline_name: Some("Fly Away".to_string()),
            flight_number: Some(number.to_string()),
            departure: Some("2030-01-01T10:00:00".to_string()),
            arrival: Some("2030-01-01T12:00:00".to_string()),
            available_seats: Some(100),
        }
    }

    fn service() -> FlightService {
        FlightService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_and_search() {
        let service = service();
        let id = service.create_flight(new_flight("FA123")).await.unwrap();

        let found = service
            .search_flights(&FlightSearch {
                flight_number: Some("fa1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[tokio::test]
    async fn test_repeated_flight_number_conflicts() {
        let service = service();
        service.create_flight(new_flight("FA123")).await.unwrap();
        let err = service.create_flight(new_flight("FA123")).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invalid_flights_are_refused() {
        let service = service();

        let err = service.create_flight(new_flight("fa123")).await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected(Rejection::Format)));

        let mut reversed = new_flight("FA124");
        reversed.arrival = Some("2030-01-01T09:00:00".to_string());
        let err = service.create_flight(reversed).await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected(Rejection::Order)));

        let mut empty = new_flight("FA125");
        empty.available_seats = Some(0);
        let err = service.create_flight(empty).await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected(Rejection::Seats)));

        let mut missing = new_flight("FA126");
        missing.airline_name = None;
        let err = service.create_flight(missing).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_bulk_creation_continues_past_bad_items() {
        let service = service();
        let outcome = service
            .create_flights_async(vec![
                new_flight("FA100"),
                new_flight("bad"),
                new_flight("FA100"),
                new_flight("FA101"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome, BulkOutcome { created: 2, failed: 2 });
        let all = service.search_flights(&FlightSearch::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_flight_is_not_found() {
        let err = service().delete_flight(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
