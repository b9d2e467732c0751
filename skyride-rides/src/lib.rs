pub mod lifecycle;
pub mod users;

pub use lifecycle::RideService;
pub use users::{NewDriver, NewPassenger, UserRegistry};
