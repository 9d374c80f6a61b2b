use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingStatus, ConflictPolicy, NewBooking, OperatingHours, Pet, Service};
use crate::services::availability::{is_slot_available, resolve_availability};
use crate::services::calendar::{bookings_on_day, summarize_month, DaySummary, YearMonth};
use crate::services::lifecycle::{self, Actor, Role};
use crate::store::{BookingStore, Directory};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: String,
    pub pet_id: String,
    pub start_at: NaiveDateTime,
    pub note: Option<String>,
}

/// Entry point to the scheduling core. Holds the injected store and
/// directory plus the schedule configuration.
#[derive(Clone)]
pub struct Scheduler {
    bookings: Arc<dyn BookingStore>,
    directory: Arc<dyn Directory>,
    hours: OperatingHours,
    policy: ConflictPolicy,
}

impl Scheduler {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        directory: Arc<dyn Directory>,
        hours: OperatingHours,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            bookings,
            directory,
            hours,
            policy,
        }
    }

    pub fn hours(&self) -> &OperatingHours {
        &self.hours
    }

    pub fn service(&self, id: &str) -> Result<Service, AppError> {
        self.directory
            .get_service(id)?
            .ok_or_else(|| AppError::NotFound(format!("service {id}")))
    }

    pub fn pet(&self, id: &str) -> Result<Pet, AppError> {
        self.directory
            .get_pet(id)?
            .ok_or_else(|| AppError::NotFound(format!("pet {id}")))
    }

    /// Pets a customer can pick in the first reservation step.
    pub fn pets_for(&self, customer: &Actor) -> Result<Vec<Pet>, AppError> {
        if customer.role != Role::Customer {
            return Err(AppError::Forbidden("only customers have pets".to_string()));
        }
        self.directory.list_pets_for_owner(&customer.id)
    }

    pub fn services_for(&self, merchant: &Actor) -> Result<Vec<Service>, AppError> {
        if merchant.role != Role::Merchant {
            return Err(AppError::Forbidden("only merchants offer services".to_string()));
        }
        self.directory.list_services_for_merchant(&merchant.id)
    }

    /// Bookable start times for a service on `date`. The pet is accepted for
    /// parity with the reservation flow but does not narrow the result. An
    /// inactive service offers nothing and answers `InactiveService`.
    pub fn available_slots(
        &self,
        service_id: &str,
        date: NaiveDate,
        pet_id: Option<&str>,
    ) -> Result<Vec<NaiveDateTime>, AppError> {
        let service = self.service(service_id)?;
        if !service.is_active {
            return Err(AppError::InactiveService(service.id));
        }
        let active = self.bookings.list_active_bookings(service_id, date)?;
        tracing::debug!(service_id, %date, pet_id, active = active.len(), "availability query");
        Ok(resolve_availability(&service, date, &active, &self.hours, self.policy))
    }

    /// Creates a pending booking after re-checking the slot. The store has
    /// the final say and may still answer `SlotConflict`.
    pub fn create_booking(&self, customer: &Actor, request: BookingRequest) -> Result<Booking, AppError> {
        if customer.role != Role::Customer {
            return Err(AppError::Forbidden("only customers can create bookings".to_string()));
        }

        let service = self.service(&request.service_id)?;
        if !service.is_active {
            return Err(AppError::InactiveService(service.id));
        }

        let pet = self.pet(&request.pet_id)?;
        if pet.owner_id != customer.id {
            return Err(AppError::Forbidden(format!(
                "pet {} does not belong to {customer}",
                pet.id
            )));
        }

        if !self.hours.offers(request.start_at.time()) {
            return Err(AppError::SlotUnavailable(request.start_at));
        }

        let active = self
            .bookings
            .list_active_bookings(&service.id, request.start_at.date())?;
        if !is_slot_available(&service, request.start_at, &active, &self.hours, self.policy) {
            tracing::warn!(
                service_id = %service.id,
                start_at = %request.start_at,
                actor = %customer,
                "requested slot already taken"
            );
            return Err(AppError::SlotConflict);
        }

        let booking = self.bookings.create_booking(NewBooking {
            service_id: service.id,
            pet_id: pet.id,
            customer_id: customer.id.clone(),
            merchant_id: service.merchant_id,
            start_at: request.start_at,
            duration_minutes: service.duration_minutes,
            note: request.note.filter(|n| !n.trim().is_empty()),
        })?;

        tracing::info!(
            booking_id = %booking.id,
            service_id = %booking.service_id,
            start_at = %booking.start_at,
            actor = %customer,
            "booking created"
        );
        Ok(booking)
    }

    pub fn update_status(
        &self,
        actor: &Actor,
        booking_id: &str,
        to: BookingStatus,
    ) -> Result<Booking, AppError> {
        let mut booking = self
            .bookings
            .get_booking(booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
        let from = booking.status;
        let stamp = booking.updated_at;

        // Rule violations are caught on the local copy and never reach the
        // store.
        lifecycle::apply(&mut booking, to, actor, stamp)?;

        let updated = self.bookings.update_status(booking_id, from, to)?;
        tracing::info!(
            booking_id,
            from = from.as_str(),
            status = updated.status.as_str(),
            actor = %actor,
            "booking status changed"
        );
        Ok(updated)
    }

    /// Bookings visible to `actor`: their own as a customer, their services'
    /// as a merchant. Ownership fields in `filter` are overridden.
    pub fn list_bookings(&self, actor: &Actor, mut filter: BookingFilter) -> Result<Vec<Booking>, AppError> {
        match actor.role {
            Role::Customer => {
                filter.customer_id = Some(actor.id.clone());
                filter.merchant_id = None;
            }
            Role::Merchant => {
                filter.merchant_id = Some(actor.id.clone());
                filter.customer_id = None;
            }
        }
        self.bookings.list_bookings(&filter)
    }

    pub fn month_summary(
        &self,
        actor: &Actor,
        month: YearMonth,
    ) -> Result<BTreeMap<NaiveDate, DaySummary>, AppError> {
        let bookings = self.list_bookings(
            actor,
            BookingFilter {
                from: Some(month.first_day()),
                to: Some(month.last_day()),
                ..Default::default()
            },
        )?;
        Ok(summarize_month(&bookings, month))
    }

    pub fn day_bookings(&self, actor: &Actor, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let bookings = self.list_bookings(
            actor,
            BookingFilter {
                from: Some(date),
                to: Some(date),
                ..Default::default()
            },
        )?;
        Ok(bookings_on_day(&bookings, date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn service(id: &str, merchant: &str, is_active: bool) -> Service {
        Service {
            id: id.to_string(),
            merchant_id: merchant.to_string(),
            name: format!("Service {id}"),
            category: "grooming".to_string(),
            price_min: 3000,
            price_max: 5000,
            duration_minutes: 60,
            is_active,
        }
    }

    fn pet(id: &str, owner: &str, name: &str) -> Pet {
        Pet {
            id: id.to_string(),
            owner_id: owner.to_string(),
            species: "cat".to_string(),
            name: name.to_string(),
        }
    }

    fn scheduler() -> Scheduler {
        let store = Arc::new(
            MemoryStore::new(ConflictPolicy::ExactStart)
                .with_service(service("S1", "M1", true))
                .with_service(service("S2", "M2", true))
                .with_service(service("S-old", "M1", false))
                .with_pet(pet("p-1", "c-1", "Mochi"))
                .with_pet(pet("p-2", "c-2", "Tofu")),
        );
        Scheduler::new(
            store.clone(),
            store,
            OperatingHours::default(),
            ConflictPolicy::ExactStart,
        )
    }

    fn request(service_id: &str, pet_id: &str, start: &str) -> BookingRequest {
        BookingRequest {
            service_id: service_id.to_string(),
            pet_id: pet_id.to_string(),
            start_at: dt(start),
            note: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_booked_slot_disappears_from_availability() {
        let s = scheduler();
        let customer = Actor::customer("c-1");
        s.create_booking(&customer, request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap();

        let slots = s.available_slots("S1", date("2024-06-10"), Some("p-1")).unwrap();
        assert_eq!(slots.len(), 9);
        assert!(!slots.contains(&dt("2024-06-10 10:00")));

        // Pet does not narrow the query.
        assert_eq!(s.available_slots("S1", date("2024-06-10"), None).unwrap(), slots);
        assert_eq!(s.available_slots("S1", date("2024-06-10"), Some("p-2")).unwrap(), slots);
    }

    #[test]
    fn test_create_booking_copies_service_fields() {
        let s = scheduler();
        let booking = s
            .create_booking(&Actor::customer("c-1"), request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.merchant_id, "M1");
        assert_eq!(booking.duration_minutes, 60);
        assert_eq!(booking.note, None);
    }

    #[test]
    fn test_second_customer_gets_slot_conflict() {
        let s = scheduler();
        s.create_booking(&Actor::customer("c-1"), request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap();
        let err = s
            .create_booking(&Actor::customer("c-2"), request("S1", "p-2", "2024-06-10 10:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::SlotConflict));
    }

    #[test]
    fn test_same_time_other_service_is_fine() {
        let s = scheduler();
        s.create_booking(&Actor::customer("c-1"), request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap();
        s.create_booking(&Actor::customer("c-1"), request("S2", "p-1", "2024-06-10 10:00"))
            .unwrap();
    }

    #[test]
    fn test_off_grid_time_rejected() {
        let s = scheduler();
        let customer = Actor::customer("c-1");
        for start in ["2024-06-10 08:00", "2024-06-10 10:30", "2024-06-10 19:00"] {
            let err = s.create_booking(&customer, request("S1", "p-1", start)).unwrap_err();
            assert!(matches!(err, AppError::SlotUnavailable(_)), "{start}");
        }
    }

    #[test]
    fn test_sub_second_start_is_off_grid() {
        let s = scheduler();
        let late = dt("2024-06-10 10:00") + chrono::Duration::milliseconds(500);
        let err = s
            .create_booking(&Actor::customer("c-1"), BookingRequest {
                start_at: late,
                ..request("S1", "p-1", "2024-06-10 10:00")
            })
            .unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable(_)));

        assert_eq!(s.available_slots("S1", date("2024-06-10"), None).unwrap().len(), 10);
        s.create_booking(&Actor::customer("c-2"), request("S1", "p-2", "2024-06-10 10:00"))
            .unwrap();
        let err = s
            .create_booking(&Actor::customer("c-1"), request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::SlotConflict));
    }

    #[test]
    fn test_overnight_booking_blocks_next_morning_under_overlap() {
        let store = Arc::new(
            MemoryStore::new(ConflictPolicy::Overlap)
                .with_service(Service {
                    duration_minutes: 16 * 60,
                    ..service("S-stay", "M1", true)
                })
                .with_pet(pet("p-1", "c-1", "Mochi")),
        );
        let s = Scheduler::new(
            store.clone(),
            store,
            OperatingHours::default(),
            ConflictPolicy::Overlap,
        );
        let customer = Actor::customer("c-1");
        s.create_booking(&customer, request("S-stay", "p-1", "2024-06-09 18:00"))
            .unwrap();

        let slots = s.available_slots("S-stay", date("2024-06-10"), None).unwrap();
        assert!(!slots.contains(&dt("2024-06-10 09:00")));
        assert_eq!(slots.first(), Some(&dt("2024-06-10 10:00")));

        let err = s
            .create_booking(&customer, request("S-stay", "p-1", "2024-06-10 09:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::SlotConflict));
        s.create_booking(&customer, request("S-stay", "p-1", "2024-06-10 10:00"))
            .unwrap();
    }

    #[test]
    fn test_inactive_service_offers_no_slots() {
        let s = scheduler();
        let err = s.available_slots("S-old", date("2024-06-10"), None).unwrap_err();
        assert!(matches!(err, AppError::InactiveService(ref id) if id == "S-old"));
    }

    #[test]
    fn test_pets_and_services_scoped_by_role() {
        let s = scheduler();
        let pets = s.pets_for(&Actor::customer("c-1")).unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].name, "Mochi");
        assert!(matches!(s.pets_for(&Actor::merchant("M1")), Err(AppError::Forbidden(_))));

        let services = s.services_for(&Actor::merchant("M1")).unwrap();
        let ids: Vec<&str> = services.iter().map(|svc| svc.id.as_str()).collect();
        assert_eq!(ids, vec!["S-old", "S1"]);
        assert!(matches!(s.services_for(&Actor::customer("c-1")), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_create_booking_validation() {
        let s = scheduler();
        let customer = Actor::customer("c-1");

        let err = s
            .create_booking(&customer, request("S9", "p-1", "2024-06-10 10:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = s
            .create_booking(&customer, request("S1", "p-9", "2024-06-10 10:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = s
            .create_booking(&customer, request("S-old", "p-1", "2024-06-10 10:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::InactiveService(_)));

        let err = s
            .create_booking(&customer, request("S1", "p-2", "2024-06-10 10:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = s
            .create_booking(&Actor::merchant("M1"), request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_lifecycle_through_scheduler() {
        let s = scheduler();
        let customer = Actor::customer("c-1");
        let merchant = Actor::merchant("M1");
        let booking = s
            .create_booking(&customer, request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap();

        let confirmed = s
            .update_status(&merchant, &booking.id, BookingStatus::Confirmed)
            .unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let err = s
            .update_status(&customer, &booking.id, BookingStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        s.update_status(&merchant, &booking.id, BookingStatus::Completed)
            .unwrap();
        let err = s
            .update_status(&merchant, &booking.id, BookingStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn test_other_merchant_forbidden() {
        let s = scheduler();
        let booking = s
            .create_booking(&Actor::customer("c-1"), request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap();
        let err = s
            .update_status(&Actor::merchant("M2"), &booking.id, BookingStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_update_missing_booking_not_found() {
        let s = scheduler();
        let err = s
            .update_status(&Actor::merchant("M1"), "missing", BookingStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_listings_are_scoped_to_actor() {
        let s = scheduler();
        s.create_booking(&Actor::customer("c-1"), request("S1", "p-1", "2024-06-10 10:00"))
            .unwrap();
        s.create_booking(&Actor::customer("c-2"), request("S2", "p-2", "2024-06-10 11:00"))
            .unwrap();

        let sneaky = BookingFilter {
            customer_id: Some("c-2".to_string()),
            ..Default::default()
        };
        let mine = s.list_bookings(&Actor::customer("c-1"), sneaky).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].customer_id, "c-1");

        let m2 = s
            .list_bookings(&Actor::merchant("M2"), BookingFilter::default())
            .unwrap();
        assert_eq!(m2.len(), 1);
        assert_eq!(m2[0].service_id, "S2");
    }

    #[test]
    fn test_month_summary_and_day_drilldown() {
        let s = scheduler();
        let customer = Actor::customer("c-1");
        let merchant = Actor::merchant("M1");
        let a = s
            .create_booking(&customer, request("S1", "p-1", "2024-06-10 14:00"))
            .unwrap();
        s.create_booking(&customer, request("S1", "p-1", "2024-06-10 09:00"))
            .unwrap();
        s.create_booking(&customer, request("S1", "p-1", "2024-07-01 09:00"))
            .unwrap();
        s.update_status(&merchant, &a.id, BookingStatus::Confirmed)
            .unwrap();

        let june = YearMonth::new(2024, 6).unwrap();
        let summary = s.month_summary(&merchant, june).unwrap();
        assert_eq!(summary.len(), 1);
        let tenth = &summary[&date("2024-06-10")];
        assert_eq!(tenth.count(BookingStatus::Pending), 1);
        assert_eq!(tenth.count(BookingStatus::Confirmed), 1);

        let day = s.day_bookings(&customer, date("2024-06-10")).unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].start_at, dt("2024-06-10 09:00"));

        assert!(s.month_summary(&Actor::merchant("M2"), june).unwrap().is_empty());
    }
}
