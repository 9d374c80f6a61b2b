use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub service_id: String,
    pub pet_id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub start_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub note: Option<String>,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn end_at(&self) -> NaiveDateTime {
        self.start_at + Duration::minutes(self.duration_minutes as i64)
    }

    pub fn date(&self) -> NaiveDate {
        self.start_at.date()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Pending and confirmed bookings hold their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking as submitted by the customer, before the store assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub service_id: String,
    pub pet_id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub start_at: NaiveDateTime,
    pub duration_minutes: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFilter {
    pub customer_id: Option<String>,
    pub merchant_id: Option<String>,
    pub service_id: Option<String>,
    pub status: Option<BookingStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl BookingFilter {
    /// `from` and `to` are inclusive calendar dates.
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(customer_id) = &self.customer_id {
            if &booking.customer_id != customer_id {
                return false;
            }
        }
        if let Some(merchant_id) = &self.merchant_id {
            if &booking.merchant_id != merchant_id {
                return false;
            }
        }
        if let Some(service_id) = &self.service_id {
            if &booking.service_id != service_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if booking.status != status {
                return false;
            }
        }
        let date = booking.date();
        if self.from.is_some_and(|from| date < from) {
            return false;
        }
        if self.to.is_some_and(|to| date > to) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booking(customer: &str, start: &str, status: BookingStatus) -> Booking {
        Booking {
            id: "b-1".to_string(),
            service_id: "s-1".to_string(),
            pet_id: "p-1".to_string(),
            customer_id: customer.to_string(),
            merchant_id: "m-1".to_string(),
            start_at: dt(start),
            duration_minutes: 90,
            note: None,
            status,
            created_at: dt("2024-06-01 08:00"),
            updated_at: dt("2024-06-01 08:00"),
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("CONFIRMED"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("archived"), None);
    }

    #[test]
    fn test_active_and_terminal_partition() {
        for status in BookingStatus::ALL {
            assert_ne!(status.is_active(), status.is_terminal());
        }
    }

    #[test]
    fn test_end_at_uses_duration() {
        let b = booking("c-1", "2024-06-10 10:00", BookingStatus::Pending);
        assert_eq!(b.end_at(), dt("2024-06-10 11:30"));
    }

    #[test]
    fn test_filter_date_bounds_are_inclusive() {
        let b = booking("c-1", "2024-06-10 18:00", BookingStatus::Pending);
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let filter = BookingFilter {
            from: Some(day),
            to: Some(day),
            ..Default::default()
        };
        assert!(filter.matches(&b));

        let filter = BookingFilter {
            from: day.succ_opt(),
            ..Default::default()
        };
        assert!(!filter.matches(&b));
    }

    #[test]
    fn test_filter_by_customer_and_status() {
        let b = booking("c-1", "2024-06-10 10:00", BookingStatus::Confirmed);
        let filter = BookingFilter {
            customer_id: Some("c-1".to_string()),
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        };
        assert!(filter.matches(&b));

        let filter = BookingFilter {
            customer_id: Some("c-2".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&b));
    }
}
