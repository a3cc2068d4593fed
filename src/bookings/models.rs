// Booking models and request/response DTOs

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::models::VehicleType;
use crate::validation::{validate_license_plate, validate_postal_code, validate_time_of_day};

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Statuses that occupy their slot for conflict purposes
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        };
        write!(f, "{}", s)
    }
}

/// Payment state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

/// Who cancelled a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancellationActor {
    Customer,
    Staff,
}

/// Where the wash takes place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// Customer drives to the wash facility
    Onsite,
    /// Staff collect and return the vehicle
    Pickup,
    /// The wash crew travels to the customer
    Mobile,
}

/// Vehicle details captured at booking time; only the type is required
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct Vehicle {
    pub vehicle_type: VehicleType,
    #[validate(length(min = 1, max = 50))]
    pub make: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub model: Option<String>,
    #[validate(custom = "validate_license_plate")]
    pub license_plate: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(max = 30))]
    pub color: Option<String>,
}

/// Booking location; address fields are required for pickup and mobile bookings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookingLocation {
    pub kind: LocationKind,
    #[validate(length(min = 1, max = 120))]
    pub street: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub city: Option<String>,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: Option<String>,
}

impl BookingLocation {
    /// Pickup and mobile bookings must carry a full address
    pub fn is_complete(&self) -> bool {
        match self.kind {
            LocationKind::Onsite => true,
            LocationKind::Pickup | LocationKind::Mobile => {
                self.street.is_some() && self.city.is_some() && self.postal_code.is_some()
            }
        }
    }
}

/// Customer rating left after completion
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    pub score: i32,
    pub comment: Option<String>,
    pub rated_at: DateTime<Utc>,
}

/// Cancellation record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cancellation {
    pub cancelled_by: CancellationActor,
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
    pub refund_id: Option<String>,
}

/// One entry in the booking's notification history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationLogEntry {
    /// What triggered the message (booking_created, status_update, ...)
    pub kind: String,
    /// Delivery channel, currently always "push"
    pub channel: String,
    pub title: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub success_count: u32,
    pub failure_count: u32,
}

/// Booking database model
#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: i32,
    pub scheduled_date: NaiveDate,
    pub slot_start: String,
    pub slot_end: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub estimated_duration: i32,
    pub loyalty_points_earned: i32,
    pub payment_intent_id: Option<String>,
    pub staff_id: Option<i32>,
    pub vehicle: Json<Vehicle>,
    pub location: Json<BookingLocation>,
    pub rating: Option<Json<Rating>>,
    pub cancellation: Option<Json<Cancellation>>,
    pub notifications: Json<Vec<NotificationLogEntry>>,
    pub notes: Option<String>,
    pub special_requests: Option<String>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scheduled start as a UTC instant
pub fn booking_starts_at(booking: &Booking) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(&booking.slot_start, "%H:%M").ok()?;
    Some(Utc.from_utc_datetime(&booking.scheduled_date.and_time(time)))
}

/// Whether the booking may still be cancelled at the given instant.
///
/// Pending bookings are cancellable at any time, even past their start.
/// Confirmed bookings need at least two hours of notice.
pub fn can_be_cancelled(booking: &Booking, now: DateTime<Utc>) -> bool {
    match booking.status {
        BookingStatus::Pending => true,
        BookingStatus::Confirmed => match booking_starts_at(booking) {
            Some(starts_at) => starts_at - now >= chrono::Duration::hours(2),
            None => false,
        },
        _ => false,
    }
}

/// One service line on a booking
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct BookingLine {
    pub id: i32,
    #[serde(skip)]
    pub booking_id: Uuid,
    pub service_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    #[schema(value_type = Vec<i32>)]
    pub addon_ids: Json<Vec<i32>>,
}

/// Requested service line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookingLineRequest {
    pub service_id: i32,
    #[validate(range(min = 1, max = 10))]
    pub quantity: i32,
    #[serde(default)]
    pub addon_ids: Vec<i32>,
}

/// Request to create a booking
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, max = 10))]
    pub services: Vec<BookingLineRequest>,
    pub scheduled_date: NaiveDate,
    #[validate(custom = "validate_time_of_day")]
    pub slot_start: String,
    #[validate(custom = "validate_time_of_day")]
    pub slot_end: String,
    #[validate]
    pub vehicle: Vehicle,
    #[validate]
    pub location: BookingLocation,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[validate(length(max = 1000))]
    pub special_requests: Option<String>,
}

/// Request to cancel a booking; the reason is mandatory
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelBookingRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Request to rate a completed booking
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RateBookingRequest {
    #[validate(range(min = 1, max = 5))]
    pub score: i32,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

/// Staff request to move a booking to a new status
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    /// Optionally assign the staff member working the booking
    pub staff_id: Option<i32>,
}

/// Booking representation returned by the API
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    pub id: Uuid,
    pub user_id: i32,
    pub scheduled_date: NaiveDate,
    pub slot_start: String,
    pub slot_end: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub estimated_duration: i32,
    pub loyalty_points_earned: i32,
    pub staff_id: Option<i32>,
    pub vehicle: Vehicle,
    pub location: BookingLocation,
    pub rating: Option<Rating>,
    pub cancellation: Option<Cancellation>,
    pub notes: Option<String>,
    pub special_requests: Option<String>,
    pub services: Vec<BookingLine>,
    pub created_at: DateTime<Utc>,
}

impl BookingResponse {
    pub fn from_booking(booking: Booking, services: Vec<BookingLine>) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            scheduled_date: booking.scheduled_date,
            slot_start: booking.slot_start,
            slot_end: booking.slot_end,
            status: booking.status,
            payment_status: booking.payment_status,
            total_amount: booking.total_amount,
            discount_amount: booking.discount_amount,
            estimated_duration: booking.estimated_duration,
            loyalty_points_earned: booking.loyalty_points_earned,
            staff_id: booking.staff_id,
            vehicle: booking.vehicle.0,
            location: booking.location.0,
            rating: booking.rating.map(|r| r.0),
            cancellation: booking.cancellation.map(|c| c.0),
            notes: booking.notes,
            special_requests: booking.special_requests,
            services,
            created_at: booking.created_at,
        }
    }
}

/// Pagination envelope for booking listings
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub pagination: PaginationInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn booking(status: BookingStatus, date: NaiveDate, slot_start: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: 1,
            scheduled_date: date,
            slot_start: slot_start.to_string(),
            slot_end: "23:59".to_string(),
            status,
            payment_status: PaymentStatus::Pending,
            total_amount: dec!(25.00),
            discount_amount: dec!(0),
            estimated_duration: 30,
            loyalty_points_earned: 10,
            payment_intent_id: None,
            staff_id: None,
            vehicle: Json(Vehicle {
                vehicle_type: VehicleType::Car,
                make: Some("Toyota".to_string()),
                model: Some("Yaris".to_string()),
                license_plate: Some("1ABC123".to_string()),
                year: None,
                color: None,
            }),
            location: Json(BookingLocation {
                kind: LocationKind::Onsite,
                street: None,
                city: None,
                postal_code: None,
            }),
            rating: None,
            cancellation: None,
            notifications: Json(vec![]),
            notes: None,
            special_requests: None,
            actual_start_time: None,
            actual_end_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn pending_booking_is_always_cancellable() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let b = booking(BookingStatus::Pending, date, "09:00");
        // Even after the scheduled start has passed
        assert!(can_be_cancelled(&b, at(2025, 6, 10, 12, 0)));
    }

    #[test]
    fn confirmed_booking_needs_two_hours_notice() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let b = booking(BookingStatus::Confirmed, date, "14:00");

        assert!(can_be_cancelled(&b, at(2025, 6, 10, 11, 59)));
        // Exactly two hours before the start is still allowed
        assert!(can_be_cancelled(&b, at(2025, 6, 10, 12, 0)));
        assert!(!can_be_cancelled(&b, at(2025, 6, 10, 12, 1)));
    }

    #[test]
    fn terminal_statuses_are_not_cancellable() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        for status in [
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ] {
            let b = booking(status, date, "14:00");
            assert!(!can_be_cancelled(&b, at(2025, 6, 1, 0, 0)));
        }
    }

    #[test]
    fn vehicle_requires_only_its_type() {
        let vehicle: Vehicle =
            serde_json::from_value(serde_json::json!({"vehicle_type": "car"})).unwrap();
        assert!(vehicle.validate().is_ok());
        assert!(vehicle.make.is_none());
        assert!(vehicle.license_plate.is_none());

        // Validators still apply to supplied values
        let vehicle: Vehicle = serde_json::from_value(
            serde_json::json!({"vehicle_type": "car", "license_plate": "not a plate"}),
        )
        .unwrap();
        assert!(vehicle.validate().is_err());
    }

    #[test]
    fn mobile_and_pickup_locations_require_full_address() {
        let complete = BookingLocation {
            kind: LocationKind::Mobile,
            street: Some("Kerkstraat 1".to_string()),
            city: Some("Gent".to_string()),
            postal_code: Some("9000".to_string()),
        };
        let incomplete = BookingLocation {
            kind: LocationKind::Pickup,
            street: Some("Kerkstraat 1".to_string()),
            city: None,
            postal_code: Some("9000".to_string()),
        };
        let onsite = BookingLocation {
            kind: LocationKind::Onsite,
            street: None,
            city: None,
            postal_code: None,
        };
        assert!(complete.is_complete());
        assert!(!incomplete.is_complete());
        assert!(onsite.is_complete());
    }

    #[test]
    fn slot_holding_statuses() {
        assert!(BookingStatus::Pending.holds_slot());
        assert!(BookingStatus::Confirmed.holds_slot());
        assert!(BookingStatus::InProgress.holds_slot());
        assert!(!BookingStatus::Completed.holds_slot());
        assert!(!BookingStatus::Cancelled.holds_slot());
        assert!(!BookingStatus::NoShow.holds_slot());
    }
}
