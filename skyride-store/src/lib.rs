pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod flight_repo;
pub mod memory;
pub mod notifications;
pub mod ride_repo;
pub mod user_repo;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use notifications::{FileNotifier, LogNotifier, NotificationQueue};

use skyride_core::repository::{
    BookingRepository, CoordinateRepository, FlightRepository, RideRepository, UserRepository,
};
use skyride_core::CoreResult;
use std::sync::Arc;
use tracing::info;

/// Every repository the services need, behind trait objects so the backing
/// store can be chosen at startup.
#[derive(Clone)]
pub struct Repositories {
    pub flights: Arc<dyn FlightRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub users: Arc<dyn UserRepository>,
    pub coordinates: Arc<dyn CoordinateRepository>,
    pub rides: Arc<dyn RideRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            flights: store.clone(),
            bookings: store.clone(),
            users: store.clone(),
            coordinates: store.clone(),
            rides: store,
        }
    }

    pub fn postgres(db: &DbClient) -> Self {
        let users = Arc::new(user_repo::PostgresUserRepository {
            pool: db.pool.clone(),
        });
        Self {
            flights: Arc::new(flight_repo::PostgresFlightRepository {
                pool: db.pool.clone(),
            }),
            bookings: Arc::new(booking_repo::PostgresBookingRepository {
                pool: db.pool.clone(),
            }),
            users: users.clone(),
            coordinates: users,
            rides: Arc::new(ride_repo::PostgresRideRepository {
                pool: db.pool.clone(),
            }),
        }
    }

    /// Wipes all data. Bookings go first, users last.
    pub async fn purge(&self) -> CoreResult<()> {
        let bookings = self.bookings.delete_all_bookings().await?;
        let rides = self.rides.delete_all_rides().await?;
        let flights = self.flights.delete_all_flights().await?;
        let users = self.users.delete_all_users().await?;
        info!(bookings, rides, flights, users, "Purged all stored data");
        Ok(())
    }
}
