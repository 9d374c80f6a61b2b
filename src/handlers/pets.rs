use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::errors::AppError;
use crate::handlers::actor_from_headers;
use crate::models::Pet;
use crate::state::AppState;

// GET /api/pets
pub async fn list_pets(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Pet>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(state.scheduler.pets_for(&actor)?))
}
