pub mod clock;
pub mod flight;
pub mod identity;
pub mod notification;
pub mod page;
pub mod repository;
pub mod ride;
pub mod user;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use flight::{Booking, BookingView, Flight, FlightSearch, FlightWindow, NewFlight};
pub use notification::{Notification, NotificationSink, Notifier, Template};
pub use page::{Page, PageRequest};
pub use ride::{NewRide, Ride, RideRules, RideStatus};
pub use user::{Category, Coordinate, GeoPoint, NewUser, Role, User, UserKind, Vehicle};
pub use validation::Rejection;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Request rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl CoreError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{} {} not found", entity, id))
    }

    /// Stable machine-readable code surfaced to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Rejected(rejection) => rejection.code(),
            CoreError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::Infrastructure(_) => "INFRASTRUCTURE",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
