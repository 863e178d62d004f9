use axum::{
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;

use crate::db::{queries::sessions::get_user_by_session, Role, User};

use super::error::ApiError;

/// Request bodies that carry rules beyond what deserialization checks.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// JSON body that has been deserialized and passed [`Validate`]. Malformed
/// bodies are rejected with 400 before any handler runs.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// The user behind the `Authorization: Bearer <token>` header.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.user.has_any_role(roles) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Teachers and admins write quiz content and grade submissions.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        self.require_any(&[Role::Admin, Role::Teacher])
    }

    pub fn is_staff(&self) -> bool {
        self.user.has_any_role(&[Role::Admin, Role::Teacher])
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for CurrentUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?.to_owned();
        let pool = SqlitePool::from_ref(state);
        match get_user_by_session(&pool, &token).await? {
            Some(user) => Ok(CurrentUser { user, token }),
            None => Err(ApiError::Unauthorized),
        }
    }
}

/// Like [`CurrentUser`] but anonymous requests are let through. A token that
/// no longer resolves to a session counts as anonymous.
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(ApiError::Unauthorized) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}
