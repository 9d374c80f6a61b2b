use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, Utc};

use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingStatus, ConflictPolicy, NewBooking, Pet, Service};
use crate::services::availability::conflicts;
use crate::services::lifecycle;
use crate::store::{BookingStore, Directory};

#[derive(Default)]
struct Inner {
    services: HashMap<String, Service>,
    pets: HashMap<String, Pet>,
    bookings: Vec<Booking>,
}

/// In-process store for tests and embedding without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    policy: ConflictPolicy,
}

impl MemoryStore {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            policy,
        }
    }

    pub fn with_service(self, service: Service) -> Self {
        self.lock().services.insert(service.id.clone(), service);
        self
    }

    pub fn with_pet(self, pet: Pet) -> Self {
        self.lock().pets.insert(pet.id.clone(), pet);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BookingStore for MemoryStore {
    fn list_active_bookings(&self, service_id: &str, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let mut found: Vec<Booking> = self
            .lock()
            .bookings
            .iter()
            .filter(|b| {
                b.service_id == service_id
                    && b.is_active()
                    && b.date().signed_duration_since(date).num_days().abs() <= 1
            })
            .cloned()
            .collect();
        found.sort_by_key(|b| b.start_at);
        Ok(found)
    }

    fn create_booking(&self, new: NewBooking) -> Result<Booking, AppError> {
        let mut inner = self.lock();
        let taken = inner.bookings.iter().any(|b| {
            b.service_id == new.service_id
                && b.is_active()
                && conflicts(new.start_at, new.duration_minutes, b, self.policy)
        });
        if taken {
            tracing::warn!(
                service_id = %new.service_id,
                start_at = %new.start_at,
                "slot already taken"
            );
            return Err(AppError::SlotConflict);
        }

        let now = Utc::now().naive_utc();
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
        inner.bookings.push(booking.clone());
        Ok(booking)
    }

    fn update_status(&self, id: &str, expected: BookingStatus, status: BookingStatus) -> Result<Booking, AppError> {
        let mut inner = self.lock();
        let booking = inner
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

        if booking.status != expected || !lifecycle::is_edge(booking.status, status) {
            return Err(AppError::InvalidTransition {
                from: booking.status,
                to: status,
            });
        }

        booking.status = status;
        booking.updated_at = Utc::now().naive_utc();
        Ok(booking.clone())
    }

    fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError> {
        Ok(self.lock().bookings.iter().find(|b| b.id == id).cloned())
    }

    fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let mut found: Vec<Booking> = self
            .lock()
            .bookings
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }
}

impl Directory for MemoryStore {
    fn get_service(&self, id: &str) -> Result<Option<Service>, AppError> {
        Ok(self.lock().services.get(id).cloned())
    }

    fn get_pet(&self, id: &str) -> Result<Option<Pet>, AppError> {
        Ok(self.lock().pets.get(id).cloned())
    }

    fn list_pets_for_owner(&self, owner_id: &str) -> Result<Vec<Pet>, AppError> {
        let mut pets: Vec<Pet> = self
            .lock()
            .pets
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        pets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pets)
    }

    fn list_services_for_merchant(&self, merchant_id: &str) -> Result<Vec<Service>, AppError> {
        let mut services: Vec<Service> = self
            .lock()
            .services
            .values()
            .filter(|s| s.merchant_id == merchant_id)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::sync::Arc;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn new_booking(customer: &str, start: &str) -> NewBooking {
        NewBooking {
            service_id: "S1".to_string(),
            pet_id: "p-1".to_string(),
            customer_id: customer.to_string(),
            merchant_id: "M1".to_string(),
            start_at: dt(start),
            duration_minutes: 60,
            note: Some("nervous around clippers".to_string()),
        }
    }

    #[test]
    fn test_concurrent_submissions_leave_one_active_booking() {
        let store = Arc::new(MemoryStore::new(ConflictPolicy::ExactStart));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.create_booking(new_booking(&format!("c-{i}"), "2024-06-10 10:00"))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let won = results.iter().filter(|r| r.is_ok()).count();
        let lost = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::SlotConflict)))
            .count();
        assert_eq!(won, 1);
        assert_eq!(lost, 7);

        let active = store
            .list_active_bookings("S1", NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_active_bookings_include_neighbouring_days() {
        let store = MemoryStore::new(ConflictPolicy::Overlap);
        store.create_booking(new_booking("c-1", "2024-06-09 23:30")).unwrap();
        store.create_booking(new_booking("c-1", "2024-06-11 08:00")).unwrap();
        store.create_booking(new_booking("c-1", "2024-06-12 09:00")).unwrap();

        let active = store
            .list_active_bookings("S1", NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
            .unwrap();
        let starts: Vec<NaiveDateTime> = active.iter().map(|b| b.start_at).collect();
        assert_eq!(starts, vec![dt("2024-06-09 23:30"), dt("2024-06-11 08:00")]);
    }

    #[test]
    fn test_cancelled_slot_can_be_rebooked() {
        let store = MemoryStore::new(ConflictPolicy::ExactStart);
        let first = store.create_booking(new_booking("c-1", "2024-06-10 10:00")).unwrap();
        store
            .update_status(&first.id, BookingStatus::Pending, BookingStatus::Cancelled)
            .unwrap();
        store.create_booking(new_booking("c-2", "2024-06-10 10:00")).unwrap();
    }

    #[test]
    fn test_list_bookings_sorted_and_filtered() {
        let store = MemoryStore::new(ConflictPolicy::ExactStart);
        store.create_booking(new_booking("c-1", "2024-06-10 15:00")).unwrap();
        store.create_booking(new_booking("c-2", "2024-06-10 09:00")).unwrap();

        let all = store.list_bookings(&BookingFilter::default()).unwrap();
        assert_eq!(all[0].start_at, dt("2024-06-10 09:00"));

        let mine = store
            .list_bookings(&BookingFilter {
                customer_id: Some("c-1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mine.len(), 1);
    }
}
