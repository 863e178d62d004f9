use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::db::Reorder;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Display color as `#RRGGBB`.
    pub color: String,
    pub hidden: bool,
    pub ordering: i64,
    #[serde(default)]
    pub question_count: i64,
}

const SELECT_CATEGORY: &str = r#"
SELECT categories.id, categories.name, categories.description, categories.color,
       categories.hidden, categories.ordering, COUNT(questions.id) AS question_count
FROM categories
LEFT JOIN questions ON questions.category_id = categories.id
"#;

pub async fn get_all_categories(pool: &SqlitePool, include_hidden: bool) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>(&format!(
        "{SELECT_CATEGORY} WHERE ?1 OR categories.hidden = FALSE GROUP BY categories.id ORDER BY categories.ordering, categories.id"
    ))
    .bind(include_hidden)
    .fetch_all(pool)
    .await
}

pub async fn get_category(pool: &SqlitePool, id: i64) -> sqlx::Result<Category> {
    sqlx::query_as::<_, Category>(&format!(
        "{SELECT_CATEGORY} WHERE categories.id = ?1 GROUP BY categories.id"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn count_categories(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await
}

pub async fn create_category(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    color: &str,
    hidden: bool,
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
INSERT INTO categories (name, description, color, hidden, ordering)
VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(ordering) + 1, 0) FROM categories))
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(color)
    .bind(hidden)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn update_category(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    description: &str,
    color: &str,
    hidden: bool,
) -> sqlx::Result<()> {
    let updated = sqlx::query(
        r#"
        UPDATE categories SET name=?1, description=?2, color=?3, hidden=?4 WHERE categories.id = ?5
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(color)
    .bind(hidden)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete_category(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    let deleted = sqlx::query("DELETE FROM categories WHERE categories.id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn reorder_categories(pool: &SqlitePool, ordering: Vec<Reorder>) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for Reorder { id, ordering } in ordering {
        sqlx::query("UPDATE categories SET ordering=?1 WHERE categories.id = ?2")
            .bind(ordering)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await
}

/// Replaces the stored categories with `categories`, keeping ids.
pub async fn import_categories(pool: &SqlitePool, categories: Vec<Category>) -> sqlx::Result<()> {
    let existing: HashSet<i64> = get_all_categories(pool, true)
        .await?
        .iter()
        .map(|c| c.id)
        .collect();
    let incoming: HashSet<i64> = categories.iter().map(|c| c.id).collect();

    let mut tx = pool.begin().await?;
    for id in existing.difference(&incoming) {
        sqlx::query("DELETE FROM categories WHERE categories.id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    for category in categories {
        sqlx::query(
            r#"
INSERT INTO categories (id, name, description, color, hidden, ordering)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(id) DO UPDATE SET
    name=excluded.name, description=excluded.description, color=excluded.color,
    hidden=excluded.hidden, ordering=excluded.ordering
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.color)
        .bind(category.hidden)
        .bind(category.ordering)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}
