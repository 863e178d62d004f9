use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::quiz::QuestionKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Question {
    pub id: i64,
    pub category_id: Option<i64>,
    pub prompt: String,
    #[sqlx(json)]
    pub kind: QuestionKind,
    pub hidden: bool,
    pub ordering: i64,
}

const SELECT_QUESTION: &str =
    "SELECT id, category_id, prompt, kind, hidden, ordering FROM questions";

/// Without hidden content a question is shown only when neither it nor its
/// category is hidden.
const VISIBLE: &str = "(hidden = FALSE AND (category_id IS NULL OR category_id NOT IN (SELECT id FROM categories WHERE hidden = TRUE)))";

pub async fn get_all_questions(pool: &SqlitePool, include_hidden: bool) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!(
        "{SELECT_QUESTION} WHERE ?1 OR {VISIBLE} ORDER BY ordering, id"
    ))
    .bind(include_hidden)
    .fetch_all(pool)
    .await
}

pub async fn get_questions_for_category(
    pool: &SqlitePool,
    category_id: i64,
    include_hidden: bool,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!(
        "{SELECT_QUESTION} WHERE category_id = ?1 AND (?2 OR {VISIBLE}) ORDER BY ordering, id"
    ))
    .bind(category_id)
    .bind(include_hidden)
    .fetch_all(pool)
    .await
}

pub async fn get_question_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Question> {
    sqlx::query_as::<_, Question>(&format!("{SELECT_QUESTION} WHERE id = ?1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn create_question(
    pool: &SqlitePool,
    category_id: Option<i64>,
    prompt: &str,
    kind: &QuestionKind,
    hidden: bool,
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
INSERT INTO questions (category_id, prompt, kind, hidden, ordering)
VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(ordering) + 1, 0) FROM questions))
        "#,
    )
    .bind(category_id)
    .bind(prompt)
    .bind(Json(kind))
    .bind(hidden)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn update_question(
    pool: &SqlitePool,
    id: i64,
    category_id: Option<i64>,
    prompt: &str,
    kind: &QuestionKind,
    hidden: bool,
) -> sqlx::Result<()> {
    let updated = sqlx::query(
        r#"
        UPDATE questions SET category_id=?1, prompt=?2, kind=?3, hidden=?4 WHERE questions.id = ?5
        "#,
    )
    .bind(category_id)
    .bind(prompt)
    .bind(Json(kind))
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

pub async fn update_question_kind(pool: &SqlitePool, id: i64, kind: &QuestionKind) -> sqlx::Result<()> {
    let updated = sqlx::query("UPDATE questions SET kind=?1 WHERE questions.id = ?2")
        .bind(Json(kind))
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

pub async fn delete_question(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    let deleted = sqlx::query("DELETE FROM questions WHERE questions.id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

/// Replaces the stored questions with `questions`, keeping ids.
pub async fn import_questions(pool: &SqlitePool, questions: Vec<Question>) -> sqlx::Result<()> {
    let existing: HashSet<i64> = get_all_questions(pool, true)
        .await?
        .iter()
        .map(|q| q.id)
        .collect();
    let incoming: HashSet<i64> = questions.iter().map(|q| q.id).collect();

    let mut tx = pool.begin().await?;
    for id in existing.difference(&incoming) {
        sqlx::query("DELETE FROM questions WHERE questions.id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    for question in questions {
        sqlx::query(
            r#"
INSERT INTO questions (id, category_id, prompt, kind, hidden, ordering)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(id) DO UPDATE SET
    category_id=excluded.category_id, prompt=excluded.prompt, kind=excluded.kind,
    hidden=excluded.hidden, ordering=excluded.ordering
            "#,
        )
        .bind(question.id)
        .bind(question.category_id)
        .bind(&question.prompt)
        .bind(Json(&question.kind))
        .bind(question.hidden)
        .bind(question.ordering)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}
