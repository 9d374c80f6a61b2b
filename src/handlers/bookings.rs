use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::{actor_from_headers, format_ts, parse_start};
use crate::models::{Booking, BookingFilter, BookingStatus};
use crate::services::lifecycle::{allowed_transitions, Actor};
use crate::services::scheduler::BookingRequest;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    service_id: String,
    pet_id: String,
    customer_id: String,
    merchant_id: String,
    start_at: String,
    duration_minutes: i32,
    note: Option<String>,
    status: String,
    allowed_transitions: Vec<String>,
    created_at: String,
    updated_at: String,
}

impl BookingResponse {
    pub(crate) fn new(b: Booking, actor: &Actor) -> Self {
        Self {
            allowed_transitions: allowed_transitions(b.status, actor.role)
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            id: b.id,
            service_id: b.service_id,
            pet_id: b.pet_id,
            customer_id: b.customer_id,
            merchant_id: b.merchant_id,
            start_at: format_ts(&b.start_at),
            duration_minutes: b.duration_minutes,
            note: b.note,
            status: b.status.as_str().to_string(),
            created_at: format_ts(&b.created_at),
            updated_at: format_ts(&b.updated_at),
        }
    }
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub service_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;

    let status = query
        .status
        .as_deref()
        .map(|s| BookingStatus::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}"))))
        .transpose()?;

    let filter = BookingFilter {
        service_id: query.service_id,
        status,
        from: query.from,
        to: query.to,
        ..Default::default()
    };

    let bookings = state.scheduler.list_bookings(&actor, filter)?;
    Ok(Json(
        bookings
            .into_iter()
            .map(|b| BookingResponse::new(b, &actor))
            .collect(),
    ))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub service_id: String,
    pub pet_id: String,
    pub start_at: String,
    pub note: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let actor = actor_from_headers(&headers)?;
    let request = BookingRequest {
        service_id: body.service_id,
        pet_id: body.pet_id,
        start_at: parse_start(&body.start_at)?,
        note: body.note,
    };

    let booking = state.scheduler.create_booking(&actor, request)?;
    Ok((StatusCode::CREATED, Json(BookingResponse::new(booking, &actor))))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let status = BookingStatus::parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", body.status)))?;

    let booking = state.scheduler.update_status(&actor, &id, status)?;
    Ok(Json(BookingResponse::new(booking, &actor)))
}
