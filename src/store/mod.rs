pub mod memory;
pub mod sqlite;

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingStatus, NewBooking, Pet, Service};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistence seam for bookings.
///
/// Implementations own the active-slot uniqueness rule: `create_booking`
/// must check and insert atomically and answer a lost race with
/// `AppError::SlotConflict`.
pub trait BookingStore: Send + Sync {
    /// Active bookings of a service that can touch slots on `date`: those
    /// starting that day or on either neighbouring day, earliest first.
    fn list_active_bookings(&self, service_id: &str, date: NaiveDate) -> Result<Vec<Booking>, AppError>;

    fn create_booking(&self, booking: NewBooking) -> Result<Booking, AppError>;

    /// Moves a booking from `expected` to `status`. Fails with
    /// `InvalidTransition` if the stored status is no longer `expected`.
    fn update_status(&self, id: &str, expected: BookingStatus, status: BookingStatus) -> Result<Booking, AppError>;

    fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError>;

    fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;
}

/// Read-only lookups of services and pets.
pub trait Directory: Send + Sync {
    fn get_service(&self, id: &str) -> Result<Option<Service>, AppError>;

    fn get_pet(&self, id: &str) -> Result<Option<Pet>, AppError>;

    fn list_pets_for_owner(&self, owner_id: &str) -> Result<Vec<Pet>, AppError>;

    fn list_services_for_merchant(&self, merchant_id: &str) -> Result<Vec<Service>, AppError>;
}
