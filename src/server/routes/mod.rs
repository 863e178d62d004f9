pub mod auth;
pub mod categories;
pub mod health;
pub mod questions;
pub mod submissions;
pub mod users;

pub use auth::auth_router;
pub use categories::category_router;
pub use health::health_router;
pub use questions::questions_router;
pub use submissions::submissions_router;
pub use users::users_router;

pub use super::error::ApiResponse;
use super::error::ApiError;

use sqlx::SqlitePool;

use crate::db::{queries::categories as category_queries, Question};

pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !(3..=32).contains(&len) || !allowed {
        return Err(ApiError::Validation(
            "username must be 3-32 characters of letters, digits, '.', '_' or '-'".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !email.chars().any(char::is_whitespace)
    });
    if !valid || email.len() > 254 {
        return Err(ApiError::Validation("email must be a valid address".into()));
    }
    Ok(())
}

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Accepts `#RRGGBB`.
pub(crate) fn validate_color(color: &str) -> Result<(), ApiError> {
    let valid = color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid {
        return Err(ApiError::Validation("color must look like #RRGGBB".into()));
    }
    Ok(())
}

/// Hidden categories do not exist for anyone but staff.
pub(crate) async fn ensure_category_visible(
    pool: &SqlitePool,
    category_id: i64,
    staff: bool,
) -> Result<(), ApiError> {
    let category = category_queries::get_category(pool, category_id).await?;
    if category.hidden && !staff {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

/// A question is public when neither it nor its category is hidden.
pub(crate) async fn is_public(pool: &SqlitePool, question: &Question) -> Result<bool, ApiError> {
    if question.hidden {
        return Ok(false);
    }
    match question.category_id {
        Some(id) => Ok(!category_queries::get_category(pool, id).await?.hidden),
        None => Ok(true),
    }
}
