use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, NaiveDate, SubsecRound, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingStatus, ConflictPolicy, NewBooking, Pet, Service};
use crate::services::availability::conflicts;
use crate::services::lifecycle;
use crate::store::{BookingStore, Directory};

/// SQLite-backed store. All access goes through one connection behind a
/// mutex, so a check and the following insert cannot interleave with
/// another writer.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
    policy: ConflictPolicy,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>, policy: ConflictPolicy) -> Self {
        Self { db, policy }
    }

    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BookingStore for SqliteStore {
    fn list_active_bookings(&self, service_id: &str, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let day_start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let start = day_start - Duration::days(1);
        let end = day_start + Duration::days(2) - Duration::seconds(1);
        let db = self.connection();
        queries::get_active_bookings_in_range(&db, service_id, &start, &end)
    }

    fn create_booking(&self, new: NewBooking) -> Result<Booking, AppError> {
        let mut db = self.connection();
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Neighbouring days too, so long bookings spanning midnight are seen
        // by the overlap policy.
        let window_start = new.start_at - Duration::days(1);
        let window_end = new.start_at + Duration::days(1);
        let nearby = queries::get_active_bookings_in_range(&tx, &new.service_id, &window_start, &window_end)?;
        if nearby
            .iter()
            .any(|b| conflicts(new.start_at, new.duration_minutes, b, self.policy))
        {
            tracing::warn!(
                service_id = %new.service_id,
                start_at = %new.start_at,
                "slot already taken"
            );
            return Err(AppError::SlotConflict);
        }

        let now = Utc::now().naive_utc().trunc_subsecs(0);
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            service_id: new.service_id,
            pet_id: new.pet_id,
            customer_id: new.customer_id,
            merchant_id: new.merchant_id,
            start_at: new.start_at,
            duration_minutes: new.duration_minutes,
            note: new.note,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        queries::create_booking(&tx, &booking)?;
        tx.commit()?;

        Ok(booking)
    }

    fn update_status(&self, id: &str, expected: BookingStatus, status: BookingStatus) -> Result<Booking, AppError> {
        let db = self.connection();
        let current = queries::get_booking_by_id(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

        if current.status != expected || !lifecycle::is_edge(current.status, status) {
            return Err(AppError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let now = Utc::now().naive_utc().trunc_subsecs(0);
        if queries::update_booking_status(&db, id, expected, status, &now)? == 0 {
            return Err(AppError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        queries::get_booking_by_id(&db, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
    }

    fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let db = self.connection();
        queries::get_booking_by_id(&db, id)
    }

    fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let db = self.connection();
        queries::list_bookings(&db, filter)
    }
}

impl Directory for SqliteStore {
    fn get_service(&self, id: &str) -> Result<Option<Service>, AppError> {
        let db = self.connection();
        queries::get_service(&db, id)
    }

    fn get_pet(&self, id: &str) -> Result<Option<Pet>, AppError> {
        let db = self.connection();
        queries::get_pet(&db, id)
    }

    fn list_pets_for_owner(&self, owner_id: &str) -> Result<Vec<Pet>, AppError> {
        let db = self.connection();
        queries::list_pets_for_owner(&db, owner_id)
    }

    fn list_services_for_merchant(&self, merchant_id: &str) -> Result<Vec<Service>, AppError> {
        let db = self.connection();
        queries::list_services_for_merchant(&db, merchant_id)
    }
}
