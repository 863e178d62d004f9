use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::{
    auth::hash_password,
    db::{queries::users, Role, User},
    server::{
        app::AppState,
        error::{ApiError, ErrorBody},
        extractors::{CurrentUser, ValidJson, Validate},
    },
};

use super::{require_text, validate_email, validate_password, validate_username, ApiResponse};

#[derive(Deserialize, ToSchema)]
pub struct NewUser {
    username: String,
    display_name: String,
    email: String,
    /// Users without a password cannot log in.
    password: Option<String>,
    roles: Vec<Role>,
}

#[derive(Deserialize, ToSchema)]
pub struct UserUpdate {
    username: String,
    display_name: String,
    email: String,
    /// Replaces the password when present.
    password: Option<String>,
    roles: Vec<Role>,
}

fn validate_user(
    username: &str,
    display_name: &str,
    email: &str,
    password: Option<&str>,
    roles: &[Role],
) -> Result<(), ApiError> {
    validate_username(username)?;
    require_text("display_name", display_name, 100)?;
    validate_email(email)?;
    if let Some(password) = password {
        validate_password(password)?;
    }
    if roles.is_empty() {
        return Err(ApiError::Validation("a user needs at least one role".into()));
    }
    Ok(())
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), ApiError> {
        validate_user(
            &self.username,
            &self.display_name,
            &self.email,
            self.password.as_deref(),
            &self.roles,
        )
    }
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        validate_user(
            &self.username,
            &self.display_name,
            &self.email,
            self.password.as_deref(),
            &self.roles,
        )
    }
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn get_users(
    State(pool): State<SqlitePool>,
    admin: CurrentUser,
) -> ApiResponse<Json<Vec<User>>> {
    admin.require_any(&[Role::Admin])?;
    Ok(Json(users::get_users(&pool).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The user", body = User),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn get_user(
    State(pool): State<SqlitePool>,
    admin: CurrentUser,
    Path(user_id): Path<i64>,
) -> ApiResponse<Json<User>> {
    admin.require_any(&[Role::Admin])?;
    Ok(Json(users::get_user(&pool, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = NewUser,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created user", body = User),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn create_user(
    State(pool): State<SqlitePool>,
    admin: CurrentUser,
    ValidJson(user): ValidJson<NewUser>,
) -> ApiResponse<(StatusCode, Json<User>)> {
    admin.require_any(&[Role::Admin])?;
    let password_hash = user.password.as_deref().map(hash_password).transpose()?;
    let user_id = users::create_user(
        &pool,
        &user.username,
        user.display_name.trim(),
        &user.email,
        password_hash.as_deref(),
        &user.roles,
    )
    .await?;
    tracing::info!(user_id, admin = admin.user.id, "Created user");
    Ok((
        StatusCode::CREATED,
        Json(users::get_user(&pool, user_id).await?),
    ))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdate,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn update_user(
    State(pool): State<SqlitePool>,
    admin: CurrentUser,
    Path(user_id): Path<i64>,
    ValidJson(user): ValidJson<UserUpdate>,
) -> ApiResponse<Json<User>> {
    admin.require_any(&[Role::Admin])?;
    if user_id == admin.user.id && !user.roles.contains(&Role::Admin) {
        return Err(ApiError::Validation(
            "admins cannot remove their own admin role".into(),
        ));
    }
    users::update_user(
        &pool,
        user_id,
        &user.username,
        user.display_name.trim(),
        &user.email,
        &user.roles,
    )
    .await?;
    if let Some(password) = user.password.as_deref() {
        users::set_password_hash(&pool, user_id, &hash_password(password)?).await?;
    }
    Ok(Json(users::get_user(&pool, user_id).await?))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    admin: CurrentUser,
    Path(user_id): Path<i64>,
) -> ApiResponse<StatusCode> {
    admin.require_any(&[Role::Admin])?;
    if user_id == admin.user.id {
        return Err(ApiError::Validation("admins cannot delete themselves".into()));
    }
    users::delete_user(&pool, user_id).await?;
    tracing::info!(user_id, admin = admin.user.id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}

pub fn users_router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .with_state(state)
}
