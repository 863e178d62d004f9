use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::{
    auth::{hash_password, verify_password},
    db::{
        queries::{sessions, users},
        Role, User,
    },
    server::{
        app::AppState,
        error::{ApiError, ErrorBody},
        extractors::{CurrentUser, ValidJson, Validate},
    },
    settings::Settings,
};

use super::{require_text, validate_email, validate_password, validate_username, ApiResponse};

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    username: String,
    display_name: String,
    email: String,
    password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email.
    login: String,
    password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_username(&self.username)?;
        require_text("display_name", &self.display_name, 100)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("login", &self.login, 254)?;
        if self.password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".into()));
        }
        Ok(())
    }
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_password(&self.new_password)
    }
}

async fn start_session(
    pool: &SqlitePool,
    settings: &Settings,
    user: User,
) -> Result<SessionResponse, ApiError> {
    let ttl = Duration::hours(settings.auth.session_ttl_hours);
    let token = sessions::create_session(pool, user.id, ttl).await?;
    Ok(SessionResponse {
        token,
        expires_at: Utc::now() + ttl,
        user,
    })
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Student account created and logged in", body = SessionResponse),
        (status = 400, description = "Invalid registration", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(pool): State<SqlitePool>,
    State(settings): State<Arc<Settings>>,
    ValidJson(form): ValidJson<RegisterRequest>,
) -> ApiResponse<(StatusCode, Json<SessionResponse>)> {
    let password_hash = hash_password(&form.password)?;
    let user_id = users::create_user(
        &pool,
        &form.username,
        form.display_name.trim(),
        &form.email,
        Some(password_hash.as_str()),
        &[Role::Student],
    )
    .await?;
    tracing::info!(user_id, "Registered student");
    let user = users::get_user(&pool, user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(start_session(&pool, &settings, user).await?),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 401, description = "Wrong credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(pool): State<SqlitePool>,
    State(settings): State<Arc<Settings>>,
    ValidJson(form): ValidJson<LoginRequest>,
) -> ApiResponse<Json<SessionResponse>> {
    let credentials = users::find_credentials(&pool, form.login.trim()).await?;
    let user = credentials.and_then(|c| {
        c.password_hash
            .filter(|hash| verify_password(&form.password, hash))
            .map(|_| c.user)
    });
    match user {
        Some(user) => {
            tracing::info!(user_id = user.id, "User logged in");
            Ok(Json(start_session(&pool, &settings, user).await?))
        }
        None => {
            tracing::warn!(login = %form.login, "Failed login attempt");
            Err(ApiError::Unauthorized)
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses((status = 204, description = "Session ended"))
)]
pub async fn logout(
    State(pool): State<SqlitePool>,
    current: CurrentUser,
) -> ApiResponse<StatusCode> {
    sessions::delete_session(&pool, &current.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The logged-in user", body = User),
        (status = 401, description = "Missing or expired session", body = ErrorBody)
    )
)]
pub async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

#[utoipa::path(
    put,
    path = "/auth/password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Password changed; other sessions are ended"),
        (status = 401, description = "Current password is wrong", body = ErrorBody)
    )
)]
pub async fn change_password(
    State(pool): State<SqlitePool>,
    current: CurrentUser,
    ValidJson(form): ValidJson<ChangePasswordRequest>,
) -> ApiResponse<StatusCode> {
    let stored = users::get_password_hash(&pool, current.user.id).await?;
    if !stored.is_some_and(|hash| verify_password(&form.current_password, &hash)) {
        return Err(ApiError::Unauthorized);
    }
    users::set_password_hash(&pool, current.user.id, &hash_password(&form.new_password)?).await?;
    let revoked = sessions::delete_other_sessions(&pool, current.user.id, &current.token).await?;
    tracing::info!(user_id = current.user.id, revoked, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/password", put(change_password))
        .with_state(state)
}
