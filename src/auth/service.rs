// Authentication service - business logic layer

use chrono::{Duration, Utc};

use crate::auth::{
    error::AuthError,
    models::{AuthResponse, Language, User, UserResponse},
    password::PasswordService,
    repository::{TokenRepository, UserRepository},
    token::TokenService,
};

/// Authentication service coordinating all auth operations
pub struct AuthService {
    user_repo: UserRepository,
    token_repo: TokenRepository,
    token_service: TokenService,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        user_repo: UserRepository,
        token_repo: TokenRepository,
        token_service: TokenService,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            token_service,
        }
    }

    /// Register a new user and issue a token pair
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        preferred_language: Language,
    ) -> Result<AuthResponse, AuthError> {
        if self.user_repo.email_exists(email).await? {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = PasswordService::hash_password(password)?;
        let user = self
            .user_repo
            .create_user(email, &password_hash, first_name, last_name, preferred_language)
            .await?;

        tracing::info!("Registered new user {}", user.id);
        self.issue_tokens(user).await
    }

    /// Login a user with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.issue_tokens(user).await
    }

    /// Rotate a refresh token into a fresh token pair
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        let stored = self
            .token_repo
            .verify_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        // Signature check on top of the stored-hash lookup
        self.token_service.validate_token(refresh_token)?;

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        // Single-use: the old token is retired before the new pair is issued
        self.token_repo.invalidate_token(refresh_token).await?;

        self.issue_tokens(user).await
    }

    /// Get current user information
    pub async fn get_current_user(&self, user_id: i32) -> Result<UserResponse, AuthError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(user.into())
    }

    /// Register a push device token for the user
    pub async fn register_device_token(&self, user_id: i32, token: &str) -> Result<(), AuthError> {
        self.user_repo.add_fcm_token(user_id, token).await
    }

    /// Remove a push device token from the user
    pub async fn remove_device_token(&self, user_id: i32, token: &str) -> Result<(), AuthError> {
        self.user_repo.remove_fcm_token(user_id, token).await
    }

    async fn issue_tokens(&self, user: User) -> Result<AuthResponse, AuthError> {
        let (access_token, refresh_token) =
            self.token_service
                .generate_token_pair(user.id, &user.email, user.role)?;

        let expires_at = Utc::now() + Duration::seconds(self.token_service.refresh_token_duration());
        self.token_repo
            .store_refresh_token(user.id, &refresh_token, expires_at)
            .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: user.into(),
        })
    }
}
