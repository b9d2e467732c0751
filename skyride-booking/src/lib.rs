pub mod booking;
pub mod flights;

pub use booking::BookingService;
pub use flights::{BulkOutcome, FlightService};
