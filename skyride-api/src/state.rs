use skyride_booking::{BookingService, FlightService};
use skyride_core::{Clock, NotificationSink, RideRules};
use skyride_rides::{RideService, UserRegistry};
use skyride_store::Repositories;
use std::sync::Arc;

use crate::auth::JwtIdentityResolver;

#[derive(Clone)]
pub struct AppState {
    pub flights: FlightService,
    pub bookings: BookingService,
    pub rides: RideService,
    pub users: UserRegistry,
    pub repositories: Repositories,
    pub identity: Arc<JwtIdentityResolver>,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        notifications: Arc<dyn NotificationSink>,
        identity: JwtIdentityResolver,
        clock: Arc<dyn Clock>,
        rules: RideRules,
    ) -> Self {
        Self {
            flights: FlightService::new(repositories.flights.clone()),
            bookings: BookingService::new(
                repositories.bookings.clone(),
                notifications.clone(),
                clock.clone(),
            ),
            rides: RideService::new(
                repositories.rides.clone(),
                repositories.users.clone(),
                repositories.coordinates.clone(),
                notifications,
                clock.clone(),
                rules,
            ),
            users: UserRegistry::new(
                repositories.users.clone(),
                repositories.coordinates.clone(),
                clock,
            ),
            repositories,
            identity: Arc::new(identity),
        }
    }
}
