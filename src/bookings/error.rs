// Booking domain errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::bookings::models::BookingStatus;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Booking {0} not found")]
    BookingNotFound(uuid::Uuid),

    #[error("Service {0} not found or inactive")]
    ServiceUnavailable(i32),

    #[error("Slot {slot_start}-{slot_end} on {date} is already taken")]
    SlotUnavailable {
        date: NaiveDate,
        slot_start: String,
        slot_end: String,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking in status {0} can no longer be cancelled")]
    NotCancellable(BookingStatus),

    #[error("Only completed bookings can be rated")]
    NotRatable,

    #[error("Booking has already been rated")]
    AlreadyRated,

    #[error("Access to this booking is not allowed")]
    Forbidden,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl BookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            BookingError::ValidationError(_) => StatusCode::BAD_REQUEST,
            BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::ServiceUnavailable(_) => StatusCode::NOT_FOUND,
            // Only genuine write contention gets a 409
            BookingError::SlotUnavailable { .. } => StatusCode::CONFLICT,
            BookingError::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
            BookingError::NotCancellable(_) => StatusCode::BAD_REQUEST,
            BookingError::NotRatable => StatusCode::BAD_REQUEST,
            BookingError::AlreadyRated => StatusCode::BAD_REQUEST,
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            BookingError::ValidationError(_) => "VALIDATION_ERROR",
            BookingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            BookingError::SlotUnavailable { .. } => "SLOT_UNAVAILABLE",
            BookingError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            BookingError::NotCancellable(_) => "NOT_CANCELLABLE",
            BookingError::NotRatable => "NOT_RATABLE",
            BookingError::AlreadyRated => "ALREADY_RATED",
            BookingError::Forbidden => "FORBIDDEN",
            BookingError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        match &self {
            BookingError::DatabaseError(msg) => error!("Database error: {}", msg),
            BookingError::SlotUnavailable {
                date,
                slot_start,
                slot_end,
            } => warn!(
                "Slot conflict rejected: {} {}-{}",
                date, slot_start, slot_end
            ),
            _ => {}
        }

        let status = self.status_code();
        // Internal detail stays out of the response body
        let message = match &self {
            BookingError::DatabaseError(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error_code": self.error_code(),
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::DatabaseError(err.to_string())
    }
}
