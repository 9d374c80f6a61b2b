pub mod booking;
pub mod operating_hours;
pub mod pet;
pub mod service;

pub use booking::{Booking, BookingFilter, BookingStatus, NewBooking};
pub use operating_hours::{ConflictPolicy, OperatingHours};
pub use pet::Pet;
pub use service::Service;
