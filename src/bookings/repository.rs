// Database repository for bookings
//
// Slot conflicts are handled in two layers: the create transaction serializes
// same-date writers with an advisory lock and tests the requested slot
// against the taken ranges with slots::ranges_overlap, and the
// bookings_no_overlap exclusion constraint backstops anything that slips
// through. Both paths surface as SlotUnavailable.

use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::bookings::error::BookingError;
use crate::bookings::models::{
    Booking, BookingLine, BookingLocation, BookingStatus, Cancellation, NotificationLogEntry,
    Rating, Vehicle,
};
use crate::bookings::pricing::Quote;
use crate::bookings::slots;

const BOOKING_COLUMNS: &str = "id, user_id, scheduled_date, slot_start, slot_end, status, \
     payment_status, total_amount, discount_amount, estimated_duration, loyalty_points_earned, \
     payment_intent_id, staff_id, vehicle, location, rating, cancellation, notifications, \
     notes, special_requests, actual_start_time, actual_end_time, created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, booking_id, service_id, quantity, unit_price, line_total, addon_ids";

/// SQLSTATE for exclusion constraint violations
const EXCLUSION_VIOLATION: &str = "23P01";

/// Data needed to insert a booking row
pub struct NewBooking {
    pub user_id: i32,
    pub scheduled_date: NaiveDate,
    pub slot_start: String,
    pub slot_end: String,
    pub vehicle: Vehicle,
    pub location: BookingLocation,
    pub notes: Option<String>,
    pub special_requests: Option<String>,
}

/// Optional filters for the staff listing
#[derive(Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
}

/// Booking repository for database operations
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new BookingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a booking and its lines, rejecting slot conflicts.
    ///
    /// The advisory lock keyed on the date serializes concurrent creates for
    /// the same day, so the in-process overlap check cannot race another
    /// insert.
    pub async fn create(
        &self,
        new: NewBooking,
        quote: &Quote,
    ) -> Result<Booking, BookingError> {
        let start_min = slots::to_minutes(&new.slot_start)
            .ok_or_else(|| BookingError::ValidationError("invalid slot_start".to_string()))?;
        let end_min = slots::to_minutes(&new.slot_end)
            .ok_or_else(|| BookingError::ValidationError("invalid slot_end".to_string()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(new.scheduled_date.to_string())
            .execute(&mut *tx)
            .await?;

        let taken: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT slot_start_min, slot_end_min FROM bookings \
             WHERE scheduled_date = $1 \
               AND status IN ('pending', 'confirmed', 'in_progress')",
        )
        .bind(new.scheduled_date)
        .fetch_all(&mut *tx)
        .await?;

        if taken
            .iter()
            .any(|&(start, end)| slots::ranges_overlap(start_min, end_min, start, end))
        {
            return Err(BookingError::SlotUnavailable {
                date: new.scheduled_date,
                slot_start: new.slot_start,
                slot_end: new.slot_end,
            });
        }

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (user_id, scheduled_date, slot_start, slot_end, \
                 total_amount, estimated_duration, loyalty_points_earned, \
                 vehicle, location, notes, special_requests) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(new.scheduled_date)
        .bind(&new.slot_start)
        .bind(&new.slot_end)
        .bind(quote.total_amount)
        .bind(quote.estimated_duration)
        .bind(quote.loyalty_points)
        .bind(Json(&new.vehicle))
        .bind(Json(&new.location))
        .bind(&new.notes)
        .bind(&new.special_requests)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_exclusion(e, &new))?;

        for line in &quote.lines {
            sqlx::query(
                "INSERT INTO booking_services \
                     (booking_id, service_id, quantity, unit_price, line_total, addon_ids) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(booking.id)
            .bind(line.service_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.line_total)
            .bind(Json(&line.addon_ids))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(booking)
    }

    /// Find a booking by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Service lines for a booking
    pub async fn find_lines(&self, booking_id: Uuid) -> Result<Vec<BookingLine>, BookingError> {
        let lines = sqlx::query_as::<_, BookingLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM booking_services WHERE booking_id = $1 ORDER BY id"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// A customer's bookings, newest scheduled date first
    pub async fn find_by_user(
        &self,
        user_id: i32,
        status: Option<BookingStatus>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Booking>, i64), BookingError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY scheduled_date DESC, slot_start DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings \
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((bookings, total))
    }

    /// All bookings for the staff dashboard, with optional filters
    pub async fn find_all(
        &self,
        filter: &BookingFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Booking>, i64), BookingError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::date IS NULL OR scheduled_date = $2) \
             ORDER BY scheduled_date DESC, slot_start DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(filter.status)
        .bind(filter.date)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::date IS NULL OR scheduled_date = $2)",
        )
        .bind(filter.status)
        .bind(filter.date)
        .fetch_one(&self.pool)
        .await?;

        Ok((bookings, total))
    }

    /// Move a booking to a new status; transition validity is checked by the
    /// caller against the row it already fetched
    pub async fn update_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        staff_id: Option<i32>,
    ) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET status = $2, \
                 staff_id = COALESCE($4, staff_id), \
                 actual_start_time = CASE WHEN $2 = 'in_progress' THEN NOW() ELSE actual_start_time END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(to)
        .bind(from)
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Complete a booking. Returns the row only when this call performed the
    /// completion, so loyalty can be awarded exactly once.
    pub async fn complete(
        &self,
        id: Uuid,
        staff_id: Option<i32>,
    ) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET status = 'completed', \
                 staff_id = COALESCE($2, staff_id), \
                 actual_end_time = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'in_progress' \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Cancel a booking guarded by its current status. Returns the row only
    /// when this call performed the cancellation.
    pub async fn cancel(
        &self,
        id: Uuid,
        cancellation: &Cancellation,
    ) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET status = 'cancelled', cancellation = $2, updated_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'confirmed') \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(cancellation))
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Record a completed refund on a cancelled booking
    pub async fn mark_refunded(&self, id: Uuid, refund_id: &str) -> Result<(), BookingError> {
        sqlx::query(
            "UPDATE bookings SET payment_status = 'refunded', \
                 cancellation = jsonb_set(cancellation, '{refund_id}', to_jsonb($2::text)), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(refund_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Attach a rating to a completed, unrated booking. Returns the row only
    /// when the rating was stored.
    pub async fn set_rating(
        &self,
        id: Uuid,
        rating: &Rating,
    ) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET rating = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'completed' AND rating IS NULL \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(rating))
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Append an entry to the booking's notification history
    pub async fn append_notification(
        &self,
        id: Uuid,
        entry: &NotificationLogEntry,
    ) -> Result<(), BookingError> {
        sqlx::query(
            "UPDATE bookings SET notifications = notifications || $2::jsonb, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(entry))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn map_exclusion(err: sqlx::Error, new: &NewBooking) -> BookingError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            return BookingError::SlotUnavailable {
                date: new.scheduled_date,
                slot_start: new.slot_start.clone(),
                slot_end: new.slot_end.clone(),
            };
        }
    }
    BookingError::DatabaseError(err.to_string())
}
