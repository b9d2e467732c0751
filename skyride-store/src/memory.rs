//! Process-local store used when no database URL is configured, and by tests.
//!
//! A booking transaction holds the store-wide lock from `begin` until it is
//! committed or dropped, which makes booking transactions fully serializable.

use async_trait::async_trait;
use skyride_core::repository::{
    BookingRepository, BookingTransaction, CoordinateRepository, FlightRepository,
    RideRepository, UserRepository,
};
use skyride_core::{
    Booking, BookingView, CoreError, CoreResult, Coordinate, Flight, FlightSearch, FlightWindow,
    GeoPoint, Page, PageRequest, Ride, RideStatus, User,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    flights: HashMap<Uuid, Flight>,
    bookings: Vec<Booking>,
    users: HashMap<Uuid, User>,
    coordinates: Vec<Coordinate>,
    rides: HashMap<Uuid, Ride>,
}

impl MemoryState {
    fn windows_for(&self, bookings: &[Booking], customer_id: Uuid) -> Vec<FlightWindow> {
        bookings
            .iter()
            .filter(|b| b.customer_id == customer_id)
            .filter_map(|b| self.flights.get(&b.flight_id))
            .map(Flight::window)
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Flights
// ============================================================================

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn insert_flight(&self, flight: &Flight) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state
            .flights
            .values()
            .any(|f| f.flight_number == flight.flight_number)
        {
            return Err(CoreError::Conflict("Flight number cannot be repeated".to_string()));
        }
        state.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn exists_by_flight_number(&self, flight_number: &str) -> CoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.flights.values().any(|f| f.flight_number == flight_number))
    }

    async fn find_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        Ok(self.state.lock().await.flights.get(&id).cloned())
    }

    async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<Flight>> {
        let state = self.state.lock().await;
        let mut flights: Vec<Flight> = state
            .flights
            .values()
            .filter(|f| search.matches(f))
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.departure);
        Ok(flights)
    }

    async fn delete_flight(&self, id: Uuid) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.flights.remove(&id).is_some();
        if removed {
            state.bookings.retain(|b| b.flight_id != id);
        }
        Ok(removed)
    }

    async fn delete_all_flights(&self) -> CoreResult<u64> {
        let mut state = self.state.lock().await;
        let count = state.flights.len() as u64;
        state.flights.clear();
        state.bookings.clear();
        Ok(count)
    }
}

// ============================================================================
// Bookings
// ============================================================================

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: Vec<Booking>,
}

#[async_trait]
impl BookingTransaction for MemoryTransaction {
    async fn lock_flight(&mut self, flight_id: Uuid) -> CoreResult<Option<Flight>> {
        Ok(self.guard.flights.get(&flight_id).cloned())
    }

    async fn lock_customer(&mut self, customer_id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.guard.users.get(&customer_id).cloned())
    }

    async fn count_bookings(&mut self, flight_id: Uuid) -> CoreResult<i64> {
        let count = self
            .guard
            .bookings
            .iter()
            .chain(self.staged.iter())
            .filter(|b| b.flight_id == flight_id)
            .count();
        Ok(count as i64)
    }

    async fn customer_windows(&mut self, customer_id: Uuid) -> CoreResult<Vec<FlightWindow>> {
        let mut windows = self.guard.windows_for(&self.guard.bookings, customer_id);
        windows.extend(self.guard.windows_for(&self.staged, customer_id));
        Ok(windows)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> CoreResult<()> {
        if !self.guard.flights.contains_key(&booking.flight_id) {
            return Err(CoreError::not_found("Flight", booking.flight_id));
        }
        if !self.guard.users.contains_key(&booking.customer_id) {
            return Err(CoreError::not_found("User", booking.customer_id));
        }
        self.staged.push(booking.clone());
        Ok(())
    }

    async fn commit(&mut self) -> CoreResult<()> {
        let staged = std::mem::take(&mut self.staged);
        self.guard.bookings.extend(staged);
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn begin(&self) -> CoreResult<Box<dyn BookingTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            staged: Vec::new(),
        }))
    }

    async fn find_booking(&self, id: Uuid) -> CoreResult<Option<BookingView>> {
        let state = self.state.lock().await;
        let view = state.bookings.iter().find(|b| b.id == id).and_then(|booking| {
            state
                .flights
                .get(&booking.flight_id)
                .map(|flight| BookingView::new(booking, flight))
        });
        Ok(view)
    }

    async fn count_for_flight(&self, flight_id: Uuid) -> CoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state.bookings.iter().filter(|b| b.flight_id == flight_id).count() as i64)
    }

    async fn delete_all_bookings(&self) -> CoreResult<u64> {
        let mut state = self.state.lock().await;
        let count = state.bookings.len() as u64;
        state.bookings.clear();
        Ok(count)
    }
}

// ============================================================================
// Users & coordinates
// ============================================================================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(CoreError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn exists_by_email(&self, email: &str) -> CoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.users.values().any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(CoreError::not_found("User", user.id)),
        }
    }

    async fn delete_user(&self, id: Uuid) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.users.remove(&id).is_some();
        if removed {
            state.bookings.retain(|b| b.customer_id != id);
        }
        Ok(removed)
    }

    async fn delete_all_users(&self) -> CoreResult<u64> {
        let mut state = self.state.lock().await;
        let count = state.users.len() as u64;
        state.users.clear();
        state.bookings.clear();
        Ok(count)
    }
}

#[async_trait]
impl CoordinateRepository for MemoryStore {
    async fn find_or_create(&self, point: GeoPoint) -> CoreResult<Coordinate> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.coordinates.iter().find(|c| c.is_at(point)) {
            return Ok(*existing);
        }
        let coordinate = Coordinate::new(point);
        state.coordinates.push(coordinate);
        Ok(coordinate)
    }
}

// ============================================================================
// Rides
// ============================================================================

#[async_trait]
impl RideRepository for MemoryStore {
    async fn insert_ride(&self, ride: &Ride) -> CoreResult<()> {
        self.state.lock().await.rides.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        Ok(self.state.lock().await.rides.get(&id).cloned())
    }

    async fn update_ride(&self, ride: &Ride) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        match state.rides.get_mut(&ride.id) {
            Some(existing) => {
                *existing = ride.clone();
                Ok(())
            }
            None => Err(CoreError::not_found("Ride", ride.id)),
        }
    }

    async fn rides_by_passenger_and_status(
        &self,
        passenger_id: Uuid,
        status: RideStatus,
        page: PageRequest,
    ) -> CoreResult<Page<Ride>> {
        let state = self.state.lock().await;
        let mut rides: Vec<Ride> = state
            .rides
            .values()
            .filter(|r| r.passenger_id == passenger_id && r.status == status)
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.departure_date.cmp(&a.departure_date));
        Ok(Page::from_items(rides, page))
    }

    async fn delete_all_rides(&self) -> CoreResult<u64> {
        let mut state = self.state.lock().await;
        let count = state.rides.len() as u64;
        state.rides.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use skyride_core::{NewUser, UserKind};

    fn flight(number: &str) -> Flight {
        let departure = Utc::now() + Duration::days(1);
        Flight {
            id: Uuid::new_v4(),
            airline_name: "Fly Away".to_string(),
            flight_number: number.to_string(),
            departure,
            arrival: departure + Duration::hours(2),
            available_seats: 2,
        }
    }

    fn customer(email: &str) -> User {
        User::new(
            NewUser {
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                email: Some(email.to_string()),
                phone_number: None,
            },
            UserKind::Customer,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_flight_number_conflicts() {
        let store = MemoryStore::new();
        store.insert_flight(&flight("FA100")).await.unwrap();
        let err = store.insert_flight(&flight("FA100")).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(store.exists_by_flight_number("FA100").await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let f = flight("FA101");
        let user = customer("jane@example.com");
        store.insert_flight(&f).await.unwrap();
        store.insert_user(&user).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_booking(&Booking::snapshot(f.id, &user, Utc::now()))
                .await
                .unwrap();
            assert_eq!(tx.count_bookings(f.id).await.unwrap(), 1);
            // dropped without commit
        }
        assert_eq!(store.count_for_flight(f.id).await.unwrap(), 0);

        let mut tx = store.begin().await.unwrap();
        tx.insert_booking(&Booking::snapshot(f.id, &user, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        drop(tx);
        assert_eq!(store.count_for_flight(f.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleting_flight_cascades_to_bookings() {
        let store = MemoryStore::new();
        let f = flight("FA102");
        let user = customer("john@example.com");
        store.insert_flight(&f).await.unwrap();
        store.insert_user(&user).await.unwrap();

        let booking = Booking::snapshot(f.id, &user, Utc::now());
        let mut tx = store.begin().await.unwrap();
        tx.insert_booking(&booking).await.unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        assert!(store.delete_flight(f.id).await.unwrap());
        assert!(store.find_booking(booking.id).await.unwrap().is_none());
        assert!(!store.delete_flight(f.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_coordinates_are_reused() {
        let store = MemoryStore::new();
        let point = GeoPoint { latitude: -12.1, longitude: -77.0 };
        let first = store.find_or_create(point).await.unwrap();
        let second = store.find_or_create(point).await.unwrap();
        assert_eq!(first.id, second.id);

        let other = store
            .find_or_create(GeoPoint { latitude: -12.2, longitude: -77.0 })
            .await
            .unwrap();
        assert_ne!(first.id, other.id);
    }
}
