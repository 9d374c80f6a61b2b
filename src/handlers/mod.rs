pub mod bookings;
pub mod calendar;
pub mod health;
pub mod pets;
pub mod services;

use axum::http::HeaderMap;
use chrono::NaiveDateTime;

use crate::errors::AppError;
use crate::services::lifecycle::{Actor, Role};

pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Reads the caller identity forwarded by the gateway.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let role = header(ACTOR_ROLE_HEADER)
        .and_then(Role::parse)
        .ok_or(AppError::Unauthorized)?;
    let id = header(ACTOR_ID_HEADER).ok_or(AppError::Unauthorized)?;

    Ok(Actor {
        role,
        id: id.to_string(),
    })
}

pub(crate) fn parse_start(s: &str) -> Result<NaiveDateTime, AppError> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
        .ok_or_else(|| AppError::BadRequest(format!("invalid start time: {s}")))
}

pub(crate) fn format_ts(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
