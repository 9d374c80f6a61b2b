use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;

use crate::models::BookingStatus;
use crate::services::wizard::WizardStep;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("service {0} is not accepting bookings")]
    InactiveService(String),

    #[error("this booking can no longer be changed ({from} -> {to})")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("that slot is no longer available, please choose another time")]
    SlotConflict,

    #[error("{} is not an available time, please choose another time", .0.format("%Y-%m-%d %H:%M"))]
    SlotUnavailable(NaiveDateTime),

    #[error("{step} is incomplete: {missing} is required")]
    IncompleteStep {
        step: WizardStep,
        missing: &'static str,
    },

    #[error("cannot {action} from {step}")]
    StepNotAllowed {
        step: WizardStep,
        action: &'static str,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InactiveService(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::SlotConflict => StatusCode::CONFLICT,
            AppError::SlotUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::IncompleteStep { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StepNotAllowed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };

        if let AppError::Database(e) = &self {
            tracing::error!(error = %e, "database error");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
