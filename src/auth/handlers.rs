// HTTP handlers for authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{AuthResponse, DeviceTokenRequest, LoginRequest, RefreshRequest, RegisterRequest, UserResponse},
};
use crate::AppState;

/// Register a new user
/// POST /api/auth/register
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    request
        .validate()
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;

    let response = state
        .auth_service
        .register(
            &request.email,
            &request.password,
            &request.first_name,
            &request.last_name,
            request.preferred_language,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login a user
/// POST /api/auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    request
        .validate()
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;

    let response = state
        .auth_service
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(response))
}

/// Refresh tokens
/// POST /api/auth/refresh
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state
        .auth_service
        .refresh_tokens(&request.refresh_token)
        .await?;

    Ok(Json(response))
}

/// Get current user information (protected endpoint)
/// GET /api/auth/me
pub async fn me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, AuthError> {
    let response = state.auth_service.get_current_user(user.user_id).await?;
    Ok(Json(response))
}

/// Register a push device token
/// POST /api/auth/device-tokens
pub async fn register_device_token_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<DeviceTokenRequest>,
) -> Result<StatusCode, AuthError> {
    request
        .validate()
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;

    state
        .auth_service
        .register_device_token(user.user_id, &request.token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Remove a push device token
/// DELETE /api/auth/device-tokens
pub async fn remove_device_token_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<DeviceTokenRequest>,
) -> Result<StatusCode, AuthError> {
    state
        .auth_service
        .remove_device_token(user.user_id, &request.token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
