use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::models::{Booking, ConflictPolicy, OperatingHours, Service};
use crate::services::slots::generate_slots;

/// Start times on `date` that `service` can still be booked for.
///
/// Only active bookings of the same service count as occupying. A customer's
/// own booking blocks its slot like anyone else's.
pub fn resolve_availability(
    service: &Service,
    date: NaiveDate,
    bookings: &[Booking],
    hours: &OperatingHours,
    policy: ConflictPolicy,
) -> Vec<NaiveDateTime> {
    let occupancy = Occupancy::new(service, bookings, policy);
    let available: Vec<NaiveDateTime> = generate_slots(service, date, hours)
        .filter(|slot| !occupancy.blocks(*slot))
        .collect();

    tracing::debug!(
        service_id = %service.id,
        %date,
        policy = policy.as_str(),
        available = available.len(),
        "resolved availability"
    );
    available
}

/// Whether a single start time is offered and free.
pub fn is_slot_available(
    service: &Service,
    start: NaiveDateTime,
    bookings: &[Booking],
    hours: &OperatingHours,
    policy: ConflictPolicy,
) -> bool {
    hours.offers(start.time()) && !Occupancy::new(service, bookings, policy).blocks(start)
}

/// Whether two active bookings would collide under `policy`.
pub fn conflicts(a_start: NaiveDateTime, a_minutes: i32, b: &Booking, policy: ConflictPolicy) -> bool {
    match policy {
        ConflictPolicy::ExactStart => a_start == b.start_at,
        ConflictPolicy::Overlap => {
            let a_end = a_start + Duration::minutes(a_minutes.max(1) as i64);
            let b_end = b.start_at + Duration::minutes(b.duration_minutes.max(1) as i64);
            a_start < b_end && b.start_at < a_end
        }
    }
}

struct Occupancy<'a> {
    policy: ConflictPolicy,
    duration_minutes: i32,
    starts: HashSet<NaiveDateTime>,
    active: Vec<&'a Booking>,
}

impl<'a> Occupancy<'a> {
    fn new(service: &Service, bookings: &'a [Booking], policy: ConflictPolicy) -> Self {
        let active: Vec<&Booking> = bookings
            .iter()
            .filter(|b| b.service_id == service.id && b.is_active())
            .collect();
        let starts = active.iter().map(|b| b.start_at).collect();
        Self {
            policy,
            duration_minutes: service.duration_minutes,
            starts,
            active,
        }
    }

    fn blocks(&self, slot: NaiveDateTime) -> bool {
        match self.policy {
            ConflictPolicy::ExactStart => self.starts.contains(&slot),
            ConflictPolicy::Overlap => self
                .active
                .iter()
                .any(|b| conflicts(slot, self.duration_minutes, b, self.policy)),
        }
    }
}
