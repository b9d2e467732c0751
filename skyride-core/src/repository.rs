use async_trait::async_trait;
use uuid::Uuid;

use crate::flight::{Booking, BookingView, Flight, FlightSearch, FlightWindow};
use crate::page::{Page, PageRequest};
use crate::ride::{Ride, RideStatus};
use crate::user::{Coordinate, GeoPoint, User};
use crate::CoreResult;

/// Repository trait for flight data access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Fails with `Conflict` when the flight number is already taken.
    async fn insert_flight(&self, flight: &Flight) -> CoreResult<()>;

    async fn exists_by_flight_number(&self, flight_number: &str) -> CoreResult<bool>;

    async fn find_flight(&self, id: Uuid) -> CoreResult<Option<Flight>>;

    async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<Flight>>;

    /// Removes the flight and, with it, every booking referencing it.
    async fn delete_flight(&self, id: Uuid) -> CoreResult<bool>;

    async fn delete_all_flights(&self) -> CoreResult<u64>;
}

/// Repository trait for bookings. Writes only happen through a
/// [`BookingTransaction`].
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn begin(&self) -> CoreResult<Box<dyn BookingTransaction>>;

    async fn find_booking(&self, id: Uuid) -> CoreResult<Option<BookingView>>;

    async fn count_for_flight(&self, flight_id: Uuid) -> CoreResult<i64>;

    async fn delete_all_bookings(&self) -> CoreResult<u64>;
}

/// One booking unit of work.
///
/// `lock_flight` serializes every transaction touching the same flight until
/// commit or drop, so the count-check-insert sequence is mutually exclusive
/// per flight. `lock_customer` does the same per customer, so the overlap
/// check sees every booking the customer committed before it. Locks are
/// always taken flight first. Dropping without `commit` rolls back.
#[async_trait]
pub trait BookingTransaction: Send {
    async fn lock_flight(&mut self, flight_id: Uuid) -> CoreResult<Option<Flight>>;

    async fn lock_customer(&mut self, customer_id: Uuid) -> CoreResult<Option<User>>;

    async fn count_bookings(&mut self, flight_id: Uuid) -> CoreResult<i64>;

    /// Windows of every flight the customer currently holds a booking on.
    async fn customer_windows(&mut self, customer_id: Uuid) -> CoreResult<Vec<FlightWindow>>;

    async fn insert_booking(&mut self, booking: &Booking) -> CoreResult<()>;

    async fn commit(&mut self) -> CoreResult<()>;
}

/// Repository trait for users of every kind
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: &User) -> CoreResult<()>;

    async fn exists_by_email(&self, email: &str) -> CoreResult<bool>;

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn update_user(&self, user: &User) -> CoreResult<()>;

    /// Rides referencing the user are left untouched.
    async fn delete_user(&self, id: Uuid) -> CoreResult<bool>;

    async fn delete_all_users(&self) -> CoreResult<u64>;
}

#[async_trait]
pub trait CoordinateRepository: Send + Sync {
    /// Returns the stored coordinate at exactly this position, creating it
    /// on first use.
    async fn find_or_create(&self, point: GeoPoint) -> CoreResult<Coordinate>;
}

/// Repository trait for rides
#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn insert_ride(&self, ride: &Ride) -> CoreResult<()>;

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<Ride>>;

    async fn update_ride(&self, ride: &Ride) -> CoreResult<()>;

    /// Newest departures first.
    async fn rides_by_passenger_and_status(
        &self,
        passenger_id: Uuid,
        status: RideStatus,
        page: PageRequest,
    ) -> CoreResult<Page<Ride>>;

    async fn delete_all_rides(&self) -> CoreResult<u64>;
}
