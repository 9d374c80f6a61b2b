use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::actor_from_headers;
use crate::handlers::bookings::BookingResponse;
use crate::services::calendar::YearMonth;
use crate::state::AppState;

// GET /api/calendar/month
#[derive(Deserialize)]
pub struct MonthQuery {
    pub month: String,
}

#[derive(Serialize)]
pub struct MonthResponse {
    month: String,
    prev: String,
    next: String,
    days: BTreeMap<String, BTreeMap<String, usize>>,
}

pub async fn month_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthResponse>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let month = YearMonth::parse(&query.month).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let summary = state.scheduler.month_summary(&actor, month)?;
    let days = summary
        .into_iter()
        .map(|(date, day)| {
            let counts = day
                .counts
                .into_iter()
                .map(|(status, n)| (status.as_str().to_string(), n))
                .collect();
            (date.format("%Y-%m-%d").to_string(), counts)
        })
        .collect();

    Ok(Json(MonthResponse {
        month: month.to_string(),
        prev: month.prev().to_string(),
        next: month.next().to_string(),
        days,
    }))
}

// GET /api/calendar/day
#[derive(Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

pub async fn day_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let bookings = state.scheduler.day_bookings(&actor, query.date)?;
    Ok(Json(
        bookings
            .into_iter()
            .map(|b| BookingResponse::new(b, &actor))
            .collect(),
    ))
}
