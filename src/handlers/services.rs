use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::{actor_from_headers, format_ts};
use crate::models::Service;
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(state.scheduler.services_for(&actor)?))
}

// GET /api/services/:id/availability
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub pet_id: Option<String>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    service_id: String,
    date: String,
    hours: String,
    slots: Vec<String>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let slots = state
        .scheduler
        .available_slots(&service_id, query.date, query.pet_id.as_deref())?;

    Ok(Json(AvailabilityResponse {
        service_id,
        date: query.date.format("%Y-%m-%d").to_string(),
        hours: state.scheduler.hours().to_human_readable(),
        slots: slots.iter().map(format_ts).collect(),
    }))
}
