use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::users::{get_user, User};

pub async fn create_session(pool: &SqlitePool, user_id: i64, ttl: Duration) -> sqlx::Result<String> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + ttl;
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)")
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Resolves a session token to its user. Expired sessions are removed and
/// treated as missing.
pub async fn get_user_by_session(pool: &SqlitePool, token: &str) -> sqlx::Result<Option<User>> {
    let session: Option<(i64, DateTime<Utc>)> =
        sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token = ?1")
            .bind(token)
            .fetch_optional(pool)
            .await?;
    let Some((user_id, expires_at)) = session else {
        return Ok(None);
    };
    if expires_at <= Utc::now() {
        delete_session(pool, token).await?;
        return Ok(None);
    }
    match get_user(pool, user_id).await {
        Ok(user) => Ok(Some(user)),
        Err(sqlx::Error::RowNotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Ends every session of `user_id` except `keep`.
pub async fn delete_other_sessions(pool: &SqlitePool, user_id: i64, keep: &str) -> sqlx::Result<u64> {
    Ok(sqlx::query("DELETE FROM sessions WHERE user_id = ?1 AND token != ?2")
        .bind(user_id)
        .bind(keep)
        .execute(pool)
        .await?
        .rows_affected())
}

pub async fn delete_expired_sessions(pool: &SqlitePool) -> sqlx::Result<u64> {
    Ok(sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
        .bind(Utc::now())
        .execute(pool)
        .await?
        .rows_affected())
}
