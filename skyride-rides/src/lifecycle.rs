//! Ride lifecycle: REQUESTED → ACCEPTED → (COMPLETED | CANCELLED)
//!
//! Assigning and cancelling are accepted from any state unless
//! [`RideRules::strict_transitions`] is set, in which case terminal rides
//! refuse both. Completion always requires an accepted ride.

use skyride_core::repository::{CoordinateRepository, RideRepository, UserRepository};
use skyride_core::validation::validate_coordinates_differ;
use skyride_core::{
    Clock, CoreError, CoreResult, NewRide, Notification, NotificationSink, Page, PageRequest,
    Ride, RideRules, RideStatus, User,
};
use skyride_shared::models::events::RideCreatedEvent;
use skyride_shared::Masked;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct RideService {
    rides: Arc<dyn RideRepository>,
    users: Arc<dyn UserRepository>,
    coordinates: Arc<dyn CoordinateRepository>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    rules: RideRules,
}

impl RideService {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        users: Arc<dyn UserRepository>,
        coordinates: Arc<dyn CoordinateRepository>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        rules: RideRules,
    ) -> Self {
        Self {
            rides,
            users,
            coordinates,
            notifications,
            clock,
            rules,
        }
    }

    pub async fn create_ride(&self, input: NewRide) -> CoreResult<Ride> {
        // 1. Both parties must exist
        let passenger = self.passenger(input.passenger_id).await?;
        self.driver(input.driver_id).await?;

        // 2. A ride has to go somewhere
        if let Err(rejection) =
            validate_coordinates_differ(input.origin_coordinates, input.destination_coordinates)
        {
            warn!(passenger_id = %passenger.id, "Ride rejected: {}", rejection);
            return Err(rejection.into());
        }

        // 3. Resolve coordinates, reusing stored ones
        let origin = self
            .coordinates
            .find_or_create(input.origin_coordinates)
            .await?;
        let destination = self
            .coordinates
            .find_or_create(input.destination_coordinates)
            .await?;

        // 4. Persist as REQUESTED
        let ride = Ride::requested(&input, origin, destination, self.clock.now());
        self.rides.insert_ride(&ride).await?;
        info!(
            ride_id = %ride.id,
            passenger_id = %ride.passenger_id,
            driver_id = %ride.driver_id,
            "Ride requested"
        );

        // 5. Tell the passenger, without waiting on delivery
        self.notify(&ride, &passenger);

        Ok(ride)
    }

    fn notify(&self, ride: &Ride, passenger: &User) {
        let Some(email) = passenger.passenger_email() else {
            return;
        };
        let event = RideCreatedEvent {
            ride_id: ride.id,
            destination_name: ride.destination_name.clone(),
            departure_date: ride.departure_date,
            price: ride.price,
        };
        let queued = Notification::ride_created(email, &event)
            .and_then(|notification| self.notifications.enqueue(notification));
        if let Err(e) = queued {
            error!(
                ride_id = %ride.id,
                recipient = %Masked(email),
                "Failed to queue ride confirmation: {}", e
            );
        }
    }

    pub async fn assign_driver(&self, ride_id: Uuid, driver_id: Uuid) -> CoreResult<Ride> {
        let mut ride = self.ride(ride_id).await?;
        self.driver(driver_id).await?;
        self.guard_terminal(&ride, RideStatus::Accepted)?;

        ride.driver_id = driver_id;
        ride.status = RideStatus::Accepted;
        self.rides.update_ride(&ride).await?;
        info!(ride_id = %ride.id, driver_id = %driver_id, "Driver assigned");
        Ok(ride)
    }

    pub async fn cancel_ride(&self, ride_id: Uuid) -> CoreResult<Ride> {
        let mut ride = self.ride(ride_id).await?;
        self.guard_terminal(&ride, RideStatus::Cancelled)?;

        ride.status = RideStatus::Cancelled;
        self.rides.update_ride(&ride).await?;
        info!(ride_id = %ride.id, "Ride cancelled");
        Ok(ride)
    }

    pub async fn complete_ride(&self, ride_id: Uuid) -> CoreResult<Ride> {
        let mut ride = self.ride(ride_id).await?;
        if ride.status != RideStatus::Accepted {
            return Err(transition(ride.status, RideStatus::Completed));
        }

        ride.status = RideStatus::Completed;
        ride.arrival_date = Some(ride.arrival_date.unwrap_or_else(|| self.clock.now()));
        self.rides.update_ride(&ride).await?;
        info!(ride_id = %ride.id, "Ride completed");
        Ok(ride)
    }

    /// Completed rides only, newest departure first.
    pub async fn passenger_rides(
        &self,
        passenger_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<Ride>> {
        self.passenger(passenger_id).await?;
        self.rides
            .rides_by_passenger_and_status(passenger_id, RideStatus::Completed, page)
            .await
    }

    fn guard_terminal(&self, ride: &Ride, to: RideStatus) -> CoreResult<()> {
        if self.rules.strict_transitions && ride.status.is_terminal() {
            return Err(transition(ride.status, to));
        }
        Ok(())
    }

    async fn ride(&self, id: Uuid) -> CoreResult<Ride> {
        self.rides
            .find_ride(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Ride", id))
    }

    async fn passenger(&self, id: Uuid) -> CoreResult<User> {
        match self.users.find_user(id).await? {
            Some(user) if user.is_passenger() => Ok(user),
            _ => Err(CoreError::not_found("Passenger", id)),
        }
    }

    async fn driver(&self, id: Uuid) -> CoreResult<User> {
        match self.users.find_user(id).await? {
            Some(user) if user.is_driver() => Ok(user),
            _ => Err(CoreError::not_found("Driver", id)),
        }
    }
}

fn transition(from: RideStatus, to: RideStatus) -> CoreError {
    CoreError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}
