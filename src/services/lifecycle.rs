use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Merchant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Merchant => "merchant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "customer" => Some(Role::Customer),
            "merchant" => Some(Role::Merchant),
            _ => None,
        }
    }
}

/// Who is asking for a change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub role: Role,
    pub id: String,
}

impl Actor {
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            role: Role::Customer,
            id: id.into(),
        }
    }

    pub fn merchant(id: impl Into<String>) -> Self {
        Self {
            role: Role::Merchant,
            id: id.into(),
        }
    }

    pub fn owns(&self, booking: &Booking) -> bool {
        match self.role {
            Role::Customer => booking.customer_id == self.id,
            Role::Merchant => booking.merchant_id == self.id,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role.as_str(), self.id)
    }
}

/// The transition table. Creation (into `Pending`) is not a transition and is
/// handled by the scheduler.
pub fn can_transition(from: BookingStatus, to: BookingStatus, role: Role) -> bool {
    use BookingStatus::*;

    matches!(
        (from, to, role),
        (Pending, Confirmed, Role::Merchant)
            | (Pending, Cancelled, Role::Merchant | Role::Customer)
            | (Confirmed, Completed, Role::Merchant)
            | (Confirmed, Cancelled, Role::Merchant)
    )
}

/// Whether `from -> to` is an edge for some role.
pub fn is_edge(from: BookingStatus, to: BookingStatus) -> bool {
    [Role::Customer, Role::Merchant]
        .into_iter()
        .any(|role| can_transition(from, to, role))
}

/// Targets reachable from `from` for `role`, for rendering only valid actions.
pub fn allowed_transitions(from: BookingStatus, role: Role) -> Vec<BookingStatus> {
    BookingStatus::ALL
        .into_iter()
        .filter(|to| can_transition(from, *to, role))
        .collect()
}

pub fn transition(from: BookingStatus, to: BookingStatus, role: Role) -> Result<BookingStatus, AppError> {
    if can_transition(from, to, role) {
        Ok(to)
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

/// Moves `booking` to `to` on behalf of `actor`. On error the booking is left
/// untouched.
pub fn apply(
    booking: &mut Booking,
    to: BookingStatus,
    actor: &Actor,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    if !actor.owns(booking) {
        return Err(AppError::Forbidden(format!(
            "{actor} cannot change booking {}",
            booking.id
        )));
    }
    booking.status = transition(booking.status, to, actor.role)?;
    booking.updated_at = now;
    Ok(())
}
