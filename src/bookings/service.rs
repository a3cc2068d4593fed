// Booking service - business logic layer

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveTime, TimeZone, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::repository::UserRepository;
use crate::bookings::error::BookingError;
use crate::bookings::models::{
    can_be_cancelled, Booking, BookingListResponse, BookingResponse, BookingStatus,
    Cancellation, CancellationActor, CreateBookingRequest, NotificationLogEntry, PaginationInfo,
    PaymentStatus, Rating,
};
use crate::bookings::pricing::build_quote;
use crate::bookings::repository::{BookingFilter, BookingRepository, NewBooking};
use crate::bookings::slots;
use crate::bookings::status_machine::StatusMachine;
use crate::catalog::repository::CatalogRepository;
use crate::clock::Clock;
use crate::gateways::payment::{to_minor_units, PaymentGateway};
use crate::gateways::push::PushGateway;

/// Booking service coordinating creation, lifecycle, and side effects
pub struct BookingService {
    booking_repo: BookingRepository,
    catalog_repo: CatalogRepository,
    user_repo: UserRepository,
    push: Arc<dyn PushGateway>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        booking_repo: BookingRepository,
        catalog_repo: CatalogRepository,
        user_repo: UserRepository,
        push: Arc<dyn PushGateway>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            booking_repo,
            catalog_repo,
            user_repo,
            push,
            payments,
            clock,
        }
    }

    /// Create a booking: price the requested services, claim the slot, and
    /// send the confirmation push.
    pub async fn create_booking(
        &self,
        user_id: i32,
        request: CreateBookingRequest,
    ) -> Result<BookingResponse, BookingError> {
        let now = self.clock.now();

        let start_min = slots::to_minutes(&request.slot_start)
            .ok_or_else(|| BookingError::ValidationError("invalid slot_start".to_string()))?;
        let end_min = slots::to_minutes(&request.slot_end)
            .ok_or_else(|| BookingError::ValidationError("invalid slot_end".to_string()))?;
        if start_min >= end_min {
            return Err(BookingError::ValidationError(
                "slot_start must be before slot_end".to_string(),
            ));
        }

        // A date counts as past once its midnight is more than 24h behind now
        let date_start = Utc.from_utc_datetime(&request.scheduled_date.and_time(NaiveTime::MIN));
        if now - date_start > Duration::hours(24) {
            return Err(BookingError::ValidationError(
                "scheduled_date is too far in the past".to_string(),
            ));
        }

        if !request.location.is_complete() {
            return Err(BookingError::ValidationError(
                "pickup and mobile bookings require a street, city, and postal code".to_string(),
            ));
        }

        // Resolve services and addons in one round trip
        let mut ids: Vec<i32> = request
            .services
            .iter()
            .flat_map(|line| {
                std::iter::once(line.service_id).chain(line.addon_ids.iter().copied())
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let services: HashMap<_, _> = self
            .catalog_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        for line in &request.services {
            let service = services
                .get(&line.service_id)
                .ok_or(BookingError::ServiceUnavailable(line.service_id))?;
            if !service.availability.0.is_available_on(request.scheduled_date) {
                return Err(BookingError::ValidationError(format!(
                    "service {} is not offered on {}",
                    line.service_id, request.scheduled_date
                )));
            }
        }

        // Prices are frozen at booking time, so the seasonal multiplier is
        // resolved against today, not the scheduled date.
        let quote = build_quote(&request.services, &services, now.date_naive())?;

        let booking = self
            .booking_repo
            .create(
                NewBooking {
                    user_id,
                    scheduled_date: request.scheduled_date,
                    slot_start: request.slot_start,
                    slot_end: request.slot_end,
                    vehicle: request.vehicle,
                    location: request.location,
                    notes: request.notes,
                    special_requests: request.special_requests,
                },
                &quote,
            )
            .await?;

        info!(
            "Created booking {} for user {} on {} {}-{}",
            booking.id, user_id, booking.scheduled_date, booking.slot_start, booking.slot_end
        );

        self.notify(
            &booking,
            "booking_created",
            "Booking received",
            &format!(
                "Your car wash on {} at {} has been received and is awaiting confirmation.",
                booking.scheduled_date, booking.slot_start
            ),
        )
        .await;

        let lines = self.booking_repo.find_lines(booking.id).await?;
        Ok(BookingResponse::from_booking(booking, lines))
    }

    /// Fetch a single booking; customers can only see their own
    pub async fn get_booking(
        &self,
        id: Uuid,
        user_id: i32,
        is_staff: bool,
    ) -> Result<BookingResponse, BookingError> {
        let booking = self.fetch(id).await?;
        if !is_staff && booking.user_id != user_id {
            return Err(BookingError::Forbidden);
        }

        let lines = self.booking_repo.find_lines(booking.id).await?;
        Ok(BookingResponse::from_booking(booking, lines))
    }

    /// A customer's own bookings, paginated
    pub async fn list_user_bookings(
        &self,
        user_id: i32,
        status: Option<BookingStatus>,
        page: i64,
        limit: i64,
    ) -> Result<BookingListResponse, BookingError> {
        let (bookings, total) = self
            .booking_repo
            .find_by_user(user_id, status, page, limit)
            .await?;
        self.to_list_response(bookings, total, page, limit).await
    }

    /// All bookings for the staff dashboard
    pub async fn list_all_bookings(
        &self,
        filter: BookingFilter,
        page: i64,
        limit: i64,
    ) -> Result<BookingListResponse, BookingError> {
        let (bookings, total) = self.booking_repo.find_all(&filter, page, limit).await?;
        self.to_list_response(bookings, total, page, limit).await
    }

    /// Staff status change. Completion awards loyalty points exactly once,
    /// even when two staff members complete the same booking concurrently.
    pub async fn update_status(
        &self,
        id: Uuid,
        to: BookingStatus,
        reason: Option<String>,
        staff_id: Option<i32>,
    ) -> Result<BookingResponse, BookingError> {
        let booking = self.fetch(id).await?;
        let from = booking.status;

        StatusMachine::transition(from, to)?;

        if from == to {
            let lines = self.booking_repo.find_lines(booking.id).await?;
            return Ok(BookingResponse::from_booking(booking, lines));
        }

        let updated = match to {
            BookingStatus::Completed => {
                match self.booking_repo.complete(id, staff_id).await? {
                    Some(completed) => {
                        // The guard returned the row, so this call performed
                        // the completion and owns the loyalty award.
                        self.user_repo
                            .award_completion(completed.user_id, completed.loyalty_points_earned)
                            .await
                            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;
                        info!(
                            "Booking {} completed, awarded {} loyalty points to user {}",
                            completed.id, completed.loyalty_points_earned, completed.user_id
                        );
                        completed
                    }
                    // Lost the race; the other writer already awarded
                    None => self.fetch(id).await?,
                }
            }
            BookingStatus::Cancelled => {
                let cancellation = Cancellation {
                    cancelled_by: CancellationActor::Staff,
                    reason,
                    cancelled_at: self.clock.now(),
                    refund_id: None,
                };
                match self.booking_repo.cancel(id, &cancellation).await? {
                    Some(cancelled) => self.refund_if_paid(cancelled).await,
                    None => {
                        let current = self.fetch(id).await?;
                        return Err(BookingError::InvalidStatusTransition {
                            from: current.status,
                            to,
                        });
                    }
                }
            }
            _ => match self.booking_repo.update_status(id, from, to, staff_id).await? {
                Some(updated) => updated,
                None => {
                    let current = self.fetch(id).await?;
                    return Err(BookingError::InvalidStatusTransition {
                        from: current.status,
                        to,
                    });
                }
            },
        };

        let (title, body) = status_notification(&updated);
        self.notify(&updated, "status_update", title, &body).await;

        let lines = self.booking_repo.find_lines(updated.id).await?;
        Ok(BookingResponse::from_booking(updated, lines))
    }

    /// Customer cancellation with the two-hour notice rule
    pub async fn cancel_booking(
        &self,
        id: Uuid,
        user_id: i32,
        reason: String,
    ) -> Result<BookingResponse, BookingError> {
        let booking = self.fetch(id).await?;
        if booking.user_id != user_id {
            return Err(BookingError::Forbidden);
        }

        let now = self.clock.now();
        if !can_be_cancelled(&booking, now) {
            return Err(BookingError::NotCancellable(booking.status));
        }

        let cancellation = Cancellation {
            cancelled_by: CancellationActor::Customer,
            reason: Some(reason),
            cancelled_at: now,
            refund_id: None,
        };

        let cancelled = self
            .booking_repo
            .cancel(id, &cancellation)
            .await?
            // The guard lost to a concurrent status change
            .ok_or(BookingError::NotCancellable(booking.status))?;

        info!("Booking {} cancelled by user {}", cancelled.id, user_id);

        let cancelled = self.refund_if_paid(cancelled).await;

        self.notify(
            &cancelled,
            "status_update",
            "Booking cancelled",
            &format!(
                "Your car wash on {} at {} has been cancelled.",
                cancelled.scheduled_date, cancelled.slot_start
            ),
        )
        .await;

        let lines = self.booking_repo.find_lines(cancelled.id).await?;
        Ok(BookingResponse::from_booking(cancelled, lines))
    }

    /// Rate a completed booking, once
    pub async fn rate_booking(
        &self,
        id: Uuid,
        user_id: i32,
        score: i32,
        comment: Option<String>,
    ) -> Result<BookingResponse, BookingError> {
        let booking = self.fetch(id).await?;
        if booking.user_id != user_id {
            return Err(BookingError::Forbidden);
        }
        if booking.status != BookingStatus::Completed {
            return Err(BookingError::NotRatable);
        }
        if booking.rating.is_some() {
            return Err(BookingError::AlreadyRated);
        }

        let rating = Rating {
            score,
            comment,
            rated_at: self.clock.now(),
        };

        let rated = self
            .booking_repo
            .set_rating(id, &rating)
            .await?
            .ok_or(BookingError::AlreadyRated)?;

        let lines = self.booking_repo.find_lines(rated.id).await?;
        Ok(BookingResponse::from_booking(rated, lines))
    }

    async fn fetch(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.booking_repo
            .find_by_id(id)
            .await?
            .ok_or(BookingError::BookingNotFound(id))
    }

    async fn to_list_response(
        &self,
        bookings: Vec<Booking>,
        total: i64,
        page: i64,
        limit: i64,
    ) -> Result<BookingListResponse, BookingError> {
        let mut out = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let lines = self.booking_repo.find_lines(booking.id).await?;
            out.push(BookingResponse::from_booking(booking, lines));
        }

        Ok(BookingListResponse {
            bookings: out,
            pagination: PaginationInfo {
                page,
                limit,
                total,
                pages: (total + limit - 1) / limit,
            },
        })
    }

    /// Refund a paid booking after cancellation. Gateway failures are logged
    /// and swallowed: the cancellation stands and the refund is retried
    /// manually from the payment provider's dashboard.
    async fn refund_if_paid(&self, booking: Booking) -> Booking {
        if booking.payment_status != PaymentStatus::Paid {
            return booking;
        }
        let Some(intent_id) = booking.payment_intent_id.clone() else {
            return booking;
        };

        let amount = to_minor_units(booking.total_amount);
        match self.payments.refund(&intent_id, amount).await {
            Ok(receipt) => {
                info!(
                    "Refunded {} minor units for booking {} (refund {})",
                    receipt.amount_minor_units, booking.id, receipt.refund_id
                );
                if let Err(e) = self
                    .booking_repo
                    .mark_refunded(booking.id, &receipt.refund_id)
                    .await
                {
                    warn!("Failed to record refund for booking {}: {}", booking.id, e);
                }
                match self.booking_repo.find_by_id(booking.id).await {
                    Ok(Some(fresh)) => fresh,
                    _ => booking,
                }
            }
            Err(e) => {
                warn!(
                    "Refund failed for booking {} (intent {}): {}",
                    booking.id, intent_id, e
                );
                booking
            }
        }
    }

    /// Best-effort push notification; failures never fail the request
    async fn notify(&self, booking: &Booking, kind: &str, title: &str, body: &str) {
        let user = match self.user_repo.find_by_id(booking.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!("Could not load user {} for push: {}", booking.user_id, e);
                return;
            }
        };

        if user.fcm_tokens.is_empty() {
            return;
        }

        let mut data = HashMap::new();
        data.insert("booking_id".to_string(), booking.id.to_string());
        data.insert("status".to_string(), booking.status.to_string());

        match self.push.send(&user.fcm_tokens, title, body, &data).await {
            Ok(report) => {
                let entry = NotificationLogEntry {
                    kind: kind.to_string(),
                    channel: "push".to_string(),
                    title: title.to_string(),
                    body: body.to_string(),
                    sent_at: self.clock.now(),
                    success_count: report.success_count,
                    failure_count: report.failure_count,
                };
                if let Err(e) = self.booking_repo.append_notification(booking.id, &entry).await {
                    warn!(
                        "Failed to log notification for booking {}: {}",
                        booking.id, e
                    );
                }
            }
            Err(e) => warn!("Push failed for booking {}: {}", booking.id, e),
        }
    }
}

fn status_notification(booking: &Booking) -> (&'static str, String) {
    match booking.status {
        BookingStatus::Confirmed => (
            "Booking confirmed",
            format!(
                "Your car wash on {} at {} is confirmed.",
                booking.scheduled_date, booking.slot_start
            ),
        ),
        BookingStatus::InProgress => (
            "Wash in progress",
            "Our team has started working on your vehicle.".to_string(),
        ),
        BookingStatus::Completed => (
            "Wash complete",
            format!(
                "Your vehicle is ready! You earned {} loyalty points.",
                booking.loyalty_points_earned
            ),
        ),
        BookingStatus::Cancelled => (
            "Booking cancelled",
            format!(
                "Your car wash on {} at {} has been cancelled.",
                booking.scheduled_date, booking.slot_start
            ),
        ),
        BookingStatus::NoShow => (
            "Missed appointment",
            "You missed your scheduled car wash. Contact us to rebook.".to_string(),
        ),
        BookingStatus::Pending => (
            "Booking received",
            format!(
                "Your car wash on {} at {} has been received.",
                booking.scheduled_date, booking.slot_start
            ),
        ),
    }
}

// End-to-end service tests against a real database. Each test seeds its own
// user and service and books a unique far-future date, so runs are isolated;
// when DATABASE_URL is unset the tests are skipped.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::models::{BookingLineRequest, BookingLocation, LocationKind, Vehicle};
    use crate::catalog::models::VehicleType;
    use crate::clock::FixedClock;
    use crate::gateways::{DeliveryReport, GatewayError, RefundReceipt};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;

    struct NoopPush;

    #[async_trait]
    impl PushGateway for NoopPush {
        async fn send(
            &self,
            _tokens: &[String],
            _title: &str,
            _body: &str,
            _data: &HashMap<String, String>,
        ) -> Result<DeliveryReport, GatewayError> {
            Ok(DeliveryReport::default())
        }
    }

    struct RefusingPayments;

    #[async_trait]
    impl PaymentGateway for RefusingPayments {
        async fn refund(
            &self,
            _payment_intent_id: &str,
            _amount_minor_units: i64,
        ) -> Result<RefundReceipt, GatewayError> {
            Err(GatewayError::Rejected {
                status: 502,
                body: "provider down".to_string(),
            })
        }
    }

    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .ok()?;
        sqlx::migrate!("./migrations").run(&pool).await.ok()?;
        Some(pool)
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    fn booking_service(pool: &PgPool) -> BookingService {
        BookingService::new(
            BookingRepository::new(pool.clone()),
            CatalogRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            Arc::new(NoopPush),
            Arc::new(RefusingPayments),
            Arc::new(FixedClock(fixed_now())),
        )
    }

    async fn seed_user(pool: &PgPool) -> i32 {
        let email = format!("{}@example.com", Uuid::new_v4());
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO users (email, password_hash, first_name, last_name) \
             VALUES ($1, 'x', 'Test', 'User') RETURNING id",
        )
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap();
        id
    }

    async fn seed_service(pool: &PgPool, price: Decimal, seasonal: serde_json::Value) -> i32 {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO services \
                 (name, description, category, price, duration_minutes, \
                  loyalty_points_earned, seasonal_pricing, availability) \
             VALUES ('{\"nl\": \"Wasbeurt\", \"fr\": \"\", \"en\": \"\"}', \
                     '{\"nl\": \"\", \"fr\": \"\", \"en\": \"\"}', \
                     'basic', $1, 30, 10, $2, \
                     '{\"monday\": true, \"tuesday\": true, \"wednesday\": true, \
                       \"thursday\": true, \"friday\": true, \"saturday\": true, \
                       \"sunday\": true}') \
             RETURNING id",
        )
        .bind(price)
        .bind(seasonal)
        .fetch_one(pool)
        .await
        .unwrap();
        id
    }

    /// A fresh far-future date so tests and reruns never collide on a slot
    fn unique_date() -> NaiveDate {
        let offset = (Uuid::new_v4().as_u128() % 200_000) as i64;
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap() + Duration::days(offset)
    }

    fn request(service_id: i32, date: NaiveDate) -> CreateBookingRequest {
        CreateBookingRequest {
            services: vec![BookingLineRequest {
                service_id,
                quantity: 1,
                addon_ids: vec![],
            }],
            scheduled_date: date,
            slot_start: "09:00".to_string(),
            slot_end: "10:00".to_string(),
            vehicle: Vehicle {
                vehicle_type: VehicleType::Car,
                make: Some("Toyota".to_string()),
                model: None,
                license_plate: None,
                year: None,
                color: None,
            },
            location: BookingLocation {
                kind: LocationKind::Onsite,
                street: None,
                city: None,
                postal_code: None,
            },
            notes: None,
            special_requests: None,
        }
    }

    #[tokio::test]
    async fn concurrent_overlapping_creates_have_one_winner() {
        let Some(pool) = test_pool().await else { return };
        let user = seed_user(&pool).await;
        let service_id = seed_service(&pool, dec!(25.00), serde_json::json!([])).await;
        let service = Arc::new(booking_service(&pool));
        let date = unique_date();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = service.clone();
            let req = request(service_id, date);
            handles.push(tokio::spawn(async move { svc.create_booking(user, req).await }));
        }

        let mut winners = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(BookingError::SlotUnavailable { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(conflicts, 3);
    }

    #[tokio::test]
    async fn completing_twice_awards_loyalty_once() {
        let Some(pool) = test_pool().await else { return };
        let user = seed_user(&pool).await;
        let service_id = seed_service(&pool, dec!(25.00), serde_json::json!([])).await;
        let service = booking_service(&pool);

        let created = service
            .create_booking(user, request(service_id, unique_date()))
            .await
            .unwrap();
        let id = created.id;

        service
            .update_status(id, BookingStatus::Confirmed, None, None)
            .await
            .unwrap();
        service
            .update_status(id, BookingStatus::InProgress, None, None)
            .await
            .unwrap();
        service
            .update_status(id, BookingStatus::Completed, None, None)
            .await
            .unwrap();
        // Second completion is an idempotent no-op
        let again = service
            .update_status(id, BookingStatus::Completed, None, None)
            .await
            .unwrap();
        assert_eq!(again.status, BookingStatus::Completed);

        let (points, total): (i32, i32) =
            sqlx::query_as("SELECT loyalty_points, total_bookings FROM users WHERE id = $1")
                .bind(user)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(points, 10);
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn refund_failure_leaves_cancellation_committed() {
        let Some(pool) = test_pool().await else { return };
        let user = seed_user(&pool).await;
        let service_id = seed_service(&pool, dec!(25.00), serde_json::json!([])).await;
        let service = booking_service(&pool);

        let created = service
            .create_booking(user, request(service_id, unique_date()))
            .await
            .unwrap();
        sqlx::query(
            "UPDATE bookings SET payment_status = 'paid', payment_intent_id = 'pi_test' \
             WHERE id = $1",
        )
        .bind(created.id)
        .execute(&pool)
        .await
        .unwrap();

        let cancelled = service
            .cancel_booking(created.id, user, "change of plans".to_string())
            .await
            .unwrap();

        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        // The gateway refused the refund; the payment state is untouched
        assert_eq!(cancelled.payment_status, PaymentStatus::Paid);
        assert!(cancelled.cancellation.as_ref().unwrap().refund_id.is_none());
    }

    #[tokio::test]
    async fn second_rating_is_rejected() {
        let Some(pool) = test_pool().await else { return };
        let user = seed_user(&pool).await;
        let service_id = seed_service(&pool, dec!(25.00), serde_json::json!([])).await;
        let service = booking_service(&pool);

        let created = service
            .create_booking(user, request(service_id, unique_date()))
            .await
            .unwrap();
        let id = created.id;
        service
            .update_status(id, BookingStatus::Confirmed, None, None)
            .await
            .unwrap();
        service
            .update_status(id, BookingStatus::InProgress, None, None)
            .await
            .unwrap();
        service
            .update_status(id, BookingStatus::Completed, None, None)
            .await
            .unwrap();

        let rated = service
            .rate_booking(id, user, 5, Some("spotless".to_string()))
            .await
            .unwrap();
        assert_eq!(rated.rating.as_ref().unwrap().score, 5);

        let err = service.rate_booking(id, user, 4, None).await.unwrap_err();
        assert!(matches!(err, BookingError::AlreadyRated));
    }

    #[tokio::test]
    async fn quote_prices_with_booking_time_multiplier() {
        let Some(pool) = test_pool().await else { return };
        let user = seed_user(&pool).await;
        // Rule covers the clock's "today" but not the scheduled date
        let seasonal = serde_json::json!([{
            "season": "summer",
            "multiplier": "1.5",
            "start_date": "2025-06-01",
            "end_date": "2025-08-31"
        }]);
        let service_id = seed_service(&pool, dec!(20.00), seasonal).await;
        let service = booking_service(&pool);

        let created = service
            .create_booking(user, request(service_id, unique_date()))
            .await
            .unwrap();

        assert_eq!(created.total_amount, dec!(30.00));
        assert_eq!(created.services[0].unit_price, dec!(30.00));
    }
}
