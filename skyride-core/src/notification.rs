use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skyride_shared::models::events::{BookingConfirmedEvent, RideCreatedEvent};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    BookingConfirmation,
    RideCreated,
}

/// A message addressed to one recipient, rendered by the notifier from a
/// template and its variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub template: Template,
    /// Id of the booking or ride the message is about.
    pub reference: Uuid,
    pub variables: Value,
}

impl Notification {
    pub fn booking_confirmed(recipient: &str, event: &BookingConfirmedEvent) -> CoreResult<Self> {
        Ok(Self {
            recipient: recipient.to_string(),
            template: Template::BookingConfirmation,
            reference: event.booking_id,
            variables: to_variables(event)?,
        })
    }

    pub fn ride_created(recipient: &str, event: &RideCreatedEvent) -> CoreResult<Self> {
        Ok(Self {
            recipient: recipient.to_string(),
            template: Template::RideCreated,
            reference: event.ride_id,
            variables: to_variables(event)?,
        })
    }

    /// Subject line and plain-text body.
    pub fn render(&self) -> (String, String) {
        let var = |key: &str| -> String {
            match self.variables.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            }
        };

        match self.template {
            Template::BookingConfirmation => {
                let body = format!(
                    "Hello {} {},\n\n\
                     Your booking was successful!\n\n\
                     The booking is for flight {} with departure date of {} and arrival date {}\n\n\
                     The booking was registered at {}.\n\n\
                     Bon Voyage!\n\
                     Fly Away Travel",
                    var("customer_first_name"),
                    var("customer_last_name"),
                    var("flight_number"),
                    var("departure"),
                    var("arrival"),
                    var("booked_at"),
                );
                ("Flight booking confirmation".to_string(), body)
            }
            Template::RideCreated => {
                let body = format!(
                    "Your ride {} to {} is booked.\n\n\
                     Departure: {}\n\
                     Price: {}\n",
                    var("ride_id"),
                    var("destination_name"),
                    var("departure_date"),
                    var("price"),
                );
                ("Ride confirmation".to_string(), body)
            }
        }
    }
}

fn to_variables<T: Serialize>(event: &T) -> CoreResult<Value> {
    serde_json::to_value(event).map_err(|e| CoreError::Infrastructure(e.to_string()))
}

/// Delivers a notification. Implementations may block on I/O; they are only
/// ever called off the request path.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> CoreResult<()>;
}

/// Hands a notification to the background dispatcher without waiting on
/// delivery.
pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, notification: Notification) -> CoreResult<()>;
}
