use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role {other}")),
        }
    }
}

/// A user as exposed to clients. The password hash never leaves the
/// database layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    display_name: String,
    email: String,
}

impl UserRow {
    fn with_roles(self, mut roles: Vec<Role>) -> User {
        roles.sort();
        User {
            id: self.id,
            username: self.username,
            display_name: self.display_name,
            email: self.email,
            roles,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    user_id: i64,
    role: Role,
}

pub struct Credentials {
    pub user: User,
    pub password_hash: Option<String>,
}

async fn roles_for(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Vec<Role>> {
    sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?1")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> sqlx::Result<User> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, display_name, email FROM users WHERE users.id = ?1",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    let roles = roles_for(pool, row.id).await?;
    Ok(row.with_roles(roles))
}

pub async fn get_users(pool: &SqlitePool) -> sqlx::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, display_name, email FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    let mut roles = sqlx::query_as::<_, RoleRow>("SELECT user_id, role FROM user_roles")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|r| (r.user_id, r.role))
        .into_group_map();

    Ok(rows
        .into_iter()
        .map(|row| {
            let user_roles = roles.remove(&row.id).unwrap_or_default();
            row.with_roles(user_roles)
        })
        .collect())
}

/// Looks a user up by username or email for a login attempt.
pub async fn find_credentials(pool: &SqlitePool, login: &str) -> sqlx::Result<Option<Credentials>> {
    let row: Option<(i64, Option<String>)> = sqlx::query_as(
        "SELECT id, password_hash FROM users WHERE username = ?1 OR email = ?1",
    )
    .bind(login)
    .fetch_optional(pool)
    .await?;
    match row {
        Some((id, password_hash)) => Ok(Some(Credentials {
            user: get_user(pool, id).await?,
            password_hash,
        })),
        None => Ok(None),
    }
}

pub async fn get_password_hash(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar("SELECT password_hash FROM users WHERE users.id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn role_exists(pool: &SqlitePool, role: Role) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE role = ?1")
        .bind(role)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

async fn replace_roles(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    roles: &[Role],
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    for role in roles.iter().unique() {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(role)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    display_name: &str,
    email: &str,
    password_hash: Option<&str>,
    roles: &[Role],
) -> sqlx::Result<i64> {
    let mut tx = pool.begin().await?;
    let user_id = sqlx::query(
        r#"
        INSERT INTO users (username, display_name, email, password_hash) VALUES(?1, ?2, ?3, ?4)
        "#,
    )
    .bind(username)
    .bind(display_name)
    .bind(email)
    .bind(password_hash)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();
    replace_roles(&mut tx, user_id, roles).await?;
    tx.commit().await?;

    Ok(user_id)
}

pub async fn update_user(
    pool: &SqlitePool,
    id: i64,
    username: &str,
    display_name: &str,
    email: &str,
    roles: &[Role],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    let updated = sqlx::query(
        r#"
        UPDATE users SET username=?1, display_name=?2, email=?3 WHERE users.id = ?4
        "#,
    )
    .bind(username)
    .bind(display_name)
    .bind(email)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    replace_roles(&mut tx, id, roles).await?;
    tx.commit().await
}

pub async fn set_password_hash(pool: &SqlitePool, id: i64, password_hash: &str) -> sqlx::Result<()> {
    let updated = sqlx::query("UPDATE users SET password_hash=?1 WHERE users.id = ?2")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> sqlx::Result<()> {
    let deleted = sqlx::query("DELETE FROM users WHERE users.id = ?1")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

/// Replaces the stored users with `users`. Existing password hashes are
/// kept; imported users without one cannot log in until a password is set.
pub async fn import_users(pool: &SqlitePool, users: Vec<User>) -> sqlx::Result<()> {
    let existing_users_ids: HashSet<i64> = get_users(pool).await?.iter().map(|u| u.id).collect();
    let new_users_ids: HashSet<i64> = users.iter().map(|u| u.id).collect();

    let mut tx = pool.begin().await?;
    for user_id in existing_users_ids.difference(&new_users_ids) {
        sqlx::query("DELETE FROM users WHERE users.id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    for user in users {
        sqlx::query(
            r#"
INSERT INTO users (id, username, display_name, email) VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(id) DO UPDATE SET
    username=excluded.username, display_name=excluded.display_name, email=excluded.email
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.email)
        .execute(&mut *tx)
        .await?;
        replace_roles(&mut tx, user.id, &user.roles).await?;
    }
    tx.commit().await
}
