use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::models::{OperatingHours, Service};

/// Candidate start times for one service-day, in ascending order.
///
/// The grid comes from the operating hours alone; the service is carried for
/// context and does not change the slicing.
pub fn generate_slots(service: &Service, date: NaiveDate, hours: &OperatingHours) -> Slots {
    tracing::trace!(
        service_id = %service.id,
        %date,
        hours = %hours.to_human_readable(),
        "generating slots"
    );
    Slots {
        next: Some(date.and_time(hours.open)),
        last: date.and_time(hours.close),
        step: Duration::minutes(hours.slot_minutes as i64),
    }
}

/// Iterator over a day's slot grid. Consumed once; generate again for a
/// fresh pass.
#[derive(Debug)]
pub struct Slots {
    next: Option<NaiveDateTime>,
    last: NaiveDateTime,
    step: Duration,
}

impl Iterator for Slots {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|t| *t <= self.last)?;
        self.next = current
            .checked_add_signed(self.step)
            .filter(|t| t.date() == current.date());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn service() -> Service {
        Service {
            id: "s-1".to_string(),
            merchant_id: "m-1".to_string(),
            name: "Bath & Brush".to_string(),
            category: "grooming".to_string(),
            price_min: 3000,
            price_max: 6000,
            duration_minutes: 60,
            is_active: true,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_default_grid_has_ten_hourly_slots() {
        let day = date("2024-06-10");
        let slots: Vec<_> = generate_slots(&service(), day, &OperatingHours::default()).collect();

        assert_eq!(slots.len(), 10);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.date(), day);
            assert_eq!(slot.time(), NaiveTime::from_hms_opt(9 + i as u32, 0, 0).unwrap());
        }
    }

    #[test]
    fn test_slots_are_strictly_ascending() {
        let slots: Vec<_> =
            generate_slots(&service(), date("2024-12-31"), &OperatingHours::default()).collect();
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_custom_granularity() {
        let hours = OperatingHours::parse("10:00", "12:00", 30).unwrap();
        let slots: Vec<_> = generate_slots(&service(), date("2024-06-10"), &hours)
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        assert_eq!(slots, vec!["10:00", "10:30", "11:00", "11:30", "12:00"]);
    }

    #[test]
    fn test_close_not_on_grid_is_excluded() {
        let hours = OperatingHours::parse("09:00", "10:45", 30).unwrap();
        let count = generate_slots(&service(), date("2024-06-10"), &hours).count();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_single_slot_window() {
        let hours = OperatingHours::parse("12:00", "12:00", 60).unwrap();
        let count = generate_slots(&service(), date("2024-06-10"), &hours).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_grid_ending_at_midnight_boundary_stops() {
        let hours = OperatingHours::parse("22:00", "23:59", 60).unwrap();
        let slots: Vec<_> = generate_slots(&service(), date("2024-06-10"), &hours).collect();
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|t| t.date() == date("2024-06-10")));
    }

    #[test]
    fn test_iterator_is_exhausted_after_one_pass() {
        let mut slots = generate_slots(&service(), date("2024-06-10"), &OperatingHours::default());
        assert_eq!(slots.by_ref().count(), 10);
        assert_eq!(slots.next(), None);
    }
}
