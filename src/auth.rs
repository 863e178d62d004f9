use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use secrecy::ExposeSecret;
use sqlx::SqlitePool;

use crate::db::{queries::users, Role};
use crate::settings::AuthSettings;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Checks `password` against a stored PHC hash string. A malformed hash
/// verifies as false.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Creates the configured admin account unless some admin already exists.
/// Returns whether an account was created.
pub async fn bootstrap_admin(pool: &SqlitePool, settings: &AuthSettings) -> anyhow::Result<bool> {
    if users::role_exists(pool, Role::Admin).await? {
        return Ok(false);
    }
    let Some(password) = settings.admin_password.as_ref() else {
        tracing::warn!("No admin account exists and auth.admin_password is not set");
        return Ok(false);
    };
    let password_hash = hash_password(password.expose_secret())?;
    let id = users::create_user(
        pool,
        &settings.admin_username,
        "Administrator",
        &settings.admin_email,
        Some(password_hash.as_str()),
        &[Role::Admin],
    )
    .await?;
    tracing::info!(id, username = %settings.admin_username, "Created admin account");
    Ok(true)
}
