// HTTP handlers for booking endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::{AuthenticatedUser, StaffUser};
use crate::bookings::error::BookingError;
use crate::bookings::models::{
    BookingListResponse, BookingResponse, BookingStatus, CancelBookingRequest,
    CreateBookingRequest, RateBookingRequest, UpdateStatusRequest,
};
use crate::bookings::repository::BookingFilter;
use crate::AppState;

const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Restrict to bookings in this status
    pub status: Option<BookingStatus>,
}

impl PaginationQuery {
    fn resolve(&self, default_limit: i64) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
}

fn validate_create(request: &CreateBookingRequest) -> Result<(), BookingError> {
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;
    for line in &request.services {
        line.validate()
            .map_err(|e| BookingError::ValidationError(e.to_string()))?;
    }
    Ok(())
}

/// Create a booking
/// POST /api/bookings
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 409, description = "Requested slot is already taken"),
        (status = 404, description = "A requested service is unavailable")
    ),
    tag = "bookings"
)]
pub async fn create_booking_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), BookingError> {
    validate_create(&request)?;

    let response = state
        .booking_service
        .create_booking(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// List the caller's bookings
/// GET /api/bookings
#[utoipa::path(
    get,
    path = "/api/bookings",
    params(PaginationQuery),
    responses(
        (status = 200, description = "The caller's bookings, newest first", body = BookingListResponse)
    ),
    tag = "bookings"
)]
pub async fn list_bookings_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<BookingListResponse>, BookingError> {
    let (page, limit) = query.resolve(10);
    let response = state
        .booking_service
        .list_user_bookings(user.user_id, query.status, page, limit)
        .await?;

    Ok(Json(response))
}

/// Get a single booking
/// GET /api/bookings/:id
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = BookingResponse),
        (status = 403, description = "Booking belongs to another customer"),
        (status = 404, description = "Booking not found")
    ),
    tag = "bookings"
)]
pub async fn get_booking_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, BookingError> {
    let response = state
        .booking_service
        .get_booking(id, user.user_id, user.role.is_staff())
        .await?;

    Ok(Json(response))
}

/// Cancel a booking
/// POST /api/bookings/:id/cancel
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelBookingRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = BookingResponse),
        (status = 400, description = "Booking can no longer be cancelled")
    ),
    tag = "bookings"
)]
pub async fn cancel_booking_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;

    let response = state
        .booking_service
        .cancel_booking(id, user.user_id, request.reason)
        .await?;

    Ok(Json(response))
}

/// Rate a completed booking
/// POST /api/bookings/:id/rate
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/rate",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = RateBookingRequest,
    responses(
        (status = 200, description = "Rating stored", body = BookingResponse),
        (status = 400, description = "Booking is not completed or already rated")
    ),
    tag = "bookings"
)]
pub async fn rate_booking_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RateBookingRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;

    let response = state
        .booking_service
        .rate_booking(id, user.user_id, request.score, request.comment)
        .await?;

    Ok(Json(response))
}

/// List all bookings (staff only)
/// GET /api/bookings/admin/all
#[utoipa::path(
    get,
    path = "/api/bookings/admin/all",
    params(AdminListQuery),
    responses(
        (status = 200, description = "All bookings matching the filters", body = BookingListResponse),
        (status = 403, description = "Caller is not staff")
    ),
    tag = "bookings"
)]
pub async fn admin_list_bookings_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<BookingListResponse>, BookingError> {
    let pagination = PaginationQuery {
        page: query.page,
        limit: query.limit,
        status: None,
    };
    let (page, limit) = pagination.resolve(20);

    let filter = BookingFilter {
        status: query.status,
        date: query.date,
    };

    let response = state
        .booking_service
        .list_all_bookings(filter, page, limit)
        .await?;

    Ok(Json(response))
}

/// Update a booking's status (staff only)
/// PUT /api/bookings/admin/:id/status
#[utoipa::path(
    put,
    path = "/api/bookings/admin/{id}/status",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = BookingResponse),
        (status = 403, description = "Caller is not staff"),
        (status = 400, description = "Transition not allowed from the current status")
    ),
    tag = "bookings"
)]
pub async fn admin_update_status_handler(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;

    let response = state
        .booking_service
        .update_status(id, request.status, request.reason, request.staff_id)
        .await?;

    Ok(Json(response))
}
