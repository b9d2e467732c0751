//! Flight booking workflow.
//!
//! Every rule runs inside one booking transaction. The flight is locked
//! before seats are counted, so two customers racing for the last seat are
//! serialized and only one of them gets it. The customer is locked next, so
//! one customer booking two overlapping flights at once gets only one.

use skyride_core::repository::BookingRepository;
use skyride_core::validation::{check_overlap, check_oversell, check_temporal_validity};
use skyride_core::{
    Booking, BookingView, Clock, CoreError, CoreResult, Flight, Notification, NotificationSink,
    User,
};
use skyride_shared::models::events::BookingConfirmedEvent;
use skyride_shared::Masked;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            notifications,
            clock,
        }
    }

    /// Books one seat for the customer and returns the booking id.
    pub async fn book_flight(&self, flight_id: Uuid, customer_id: Uuid) -> CoreResult<Uuid> {
        let (booking, flight, customer) = match self.reserve(flight_id, customer_id).await {
            Ok(reserved) => reserved,
            Err(CoreError::Rejected(rejection)) => {
                warn!(
                    flight_id = %flight_id,
                    customer_id = %customer_id,
                    code = rejection.code(),
                    "Booking rejected: {}", rejection
                );
                return Err(rejection.into());
            }
            Err(e) => return Err(e),
        };

        info!(
            booking_id = %booking.id,
            flight_id = %flight.id,
            customer_id = %customer.id,
            "Booking confirmed"
        );

        // Delivery problems never undo a committed booking
        self.notify(&booking, &flight, &customer);

        Ok(booking.id)
    }

    async fn reserve(
        &self,
        flight_id: Uuid,
        customer_id: Uuid,
    ) -> CoreResult<(Booking, Flight, User)> {
        // 1. Open the unit of work; dropping it on any early return rolls back
        let mut tx = self.bookings.begin().await?;

        // 2. Lock the flight row
        let flight = tx
            .lock_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Flight", flight_id))?;

        // 3. Lock the customer, serializing their concurrent bookings
        let customer = tx
            .lock_customer(customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", customer_id))?;

        // 4. Capacity, recounted under the lock
        let booked = tx.count_bookings(flight.id).await?;
        check_oversell(&flight, booked)?;

        // 5. Time
        check_temporal_validity(&flight, self.clock.now())?;

        // 6. The customer's other flights
        let windows = tx.customer_windows(customer.id).await?;
        check_overlap(flight.window(), &windows)?;

        // 7. Persist the snapshot
        let booking = Booking::snapshot(flight.id, &customer, self.clock.now());
        tx.insert_booking(&booking).await?;

        // 8. Commit
        tx.commit().await?;

        Ok((booking, flight, customer))
    }

    fn notify(&self, booking: &Booking, flight: &Flight, customer: &User) {
        let event = BookingConfirmedEvent {
            booking_id: booking.id,
            flight_number: flight.flight_number.clone(),
            customer_first_name: booking.customer_first_name.clone(),
            customer_last_name: booking.customer_last_name.clone(),
            departure: flight.departure,
            arrival: flight.arrival,
            booked_at: booking.booked_at,
        };

        let queued = Notification::booking_confirmed(&customer.email, &event)
            .and_then(|notification| self.notifications.enqueue(notification));
        if let Err(e) = queued {
            error!(
                booking_id = %booking.id,
                recipient = %Masked(customer.email.as_str()),
                "Failed to queue booking confirmation: {}", e
            );
        }
    }

    pub async fn get_booking(&self, id: Uuid) -> CoreResult<BookingView> {
        self.bookings
            .find_booking(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", id))
    }
}
