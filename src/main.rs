pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod clock;
pub mod db;
pub mod error;
pub mod gateways;
pub mod validation;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::repository::{TokenRepository, UserRepository};
use auth::service::AuthService;
use auth::token::TokenService;
use bookings::repository::BookingRepository;
use bookings::service::BookingService;
use catalog::repository::CatalogRepository;
use clock::{Clock, SystemClock};
use gateways::payment::{PaymentGateway, StripeClient};
use gateways::push::{FcmClient, PushGateway};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::handlers::list_services_handler,
        catalog::handlers::get_service_handler,
        bookings::handlers::create_booking_handler,
        bookings::handlers::list_bookings_handler,
        bookings::handlers::get_booking_handler,
        bookings::handlers::cancel_booking_handler,
        bookings::handlers::rate_booking_handler,
        bookings::handlers::admin_list_bookings_handler,
        bookings::handlers::admin_update_status_handler,
    ),
    components(
        schemas(
            catalog::models::ServiceResponse,
            catalog::models::ServiceCategory,
            catalog::models::VehicleType,
            catalog::models::Season,
            catalog::models::SeasonalRule,
            catalog::models::LocalizedText,
            catalog::models::LocalizedList,
            catalog::models::WeeklyAvailability,
            bookings::models::BookingStatus,
            bookings::models::PaymentStatus,
            bookings::models::CancellationActor,
            bookings::models::LocationKind,
            bookings::models::Vehicle,
            bookings::models::BookingLocation,
            bookings::models::Rating,
            bookings::models::Cancellation,
            bookings::models::BookingLine,
            bookings::models::BookingLineRequest,
            bookings::models::CreateBookingRequest,
            bookings::models::CancelBookingRequest,
            bookings::models::RateBookingRequest,
            bookings::models::UpdateStatusRequest,
            bookings::models::BookingResponse,
            bookings::models::BookingListResponse,
            bookings::models::PaginationInfo,
        )
    ),
    tags(
        (name = "catalog", description = "Wash service catalog"),
        (name = "bookings", description = "Booking lifecycle endpoints")
    ),
    info(
        title = "Car Wash Booking API",
        version = "1.0.0",
        description = "RESTful API for booking car wash appointments"
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth_service: Arc<AuthService>,
    pub booking_service: Arc<BookingService>,
    pub catalog_repo: CatalogRepository,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire up the full service graph. Gateways and the clock are injected so
    /// tests can swap them for fakes.
    pub fn new(
        db: PgPool,
        jwt_secret: String,
        push: Arc<dyn PushGateway>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let user_repo = UserRepository::new(db.clone());
        let token_repo = TokenRepository::new(db.clone());
        let booking_repo = BookingRepository::new(db.clone());
        let catalog_repo = CatalogRepository::new(db.clone());

        let auth_service = Arc::new(AuthService::new(
            user_repo.clone(),
            token_repo,
            TokenService::new(jwt_secret),
        ));

        let booking_service = Arc::new(BookingService::new(
            booking_repo,
            catalog_repo.clone(),
            user_repo,
            push,
            payments,
            clock.clone(),
        ));

        Self {
            db,
            auth_service,
            booking_service,
            catalog_repo,
            clock,
        }
    }
}

/// Creates and configures the application router
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Auth
        .route("/api/auth/register", post(auth::handlers::register_handler))
        .route("/api/auth/login", post(auth::handlers::login_handler))
        .route("/api/auth/refresh", post(auth::handlers::refresh_handler))
        .route("/api/auth/me", get(auth::handlers::me_handler))
        .route(
            "/api/auth/device-tokens",
            post(auth::handlers::register_device_token_handler)
                .delete(auth::handlers::remove_device_token_handler),
        )
        // Catalog
        .route("/api/services", get(catalog::handlers::list_services_handler))
        .route("/api/services/:id", get(catalog::handlers::get_service_handler))
        // Bookings
        .route(
            "/api/bookings",
            post(bookings::handlers::create_booking_handler)
                .get(bookings::handlers::list_bookings_handler),
        )
        .route(
            "/api/bookings/admin/all",
            get(bookings::handlers::admin_list_bookings_handler),
        )
        .route(
            "/api/bookings/admin/:id/status",
            put(bookings::handlers::admin_update_status_handler),
        )
        .route("/api/bookings/:id", get(bookings::handlers::get_booking_handler))
        .route(
            "/api/bookings/:id/cancel",
            post(bookings::handlers::cancel_booking_handler),
        )
        .route(
            "/api/bookings/:id/rate",
            post(bookings::handlers::rate_booking_handler),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("Car Wash Booking API - Starting...");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    let fcm_server_key = std::env::var("FCM_SERVER_KEY").unwrap_or_default();
    let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY").unwrap_or_default();
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let state = AppState::new(
        db_pool,
        jwt_secret,
        Arc::new(FcmClient::new(fcm_server_key)),
        Arc::new(StripeClient::new(stripe_secret_key)),
        Arc::new(SystemClock),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Car Wash Booking API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests;
