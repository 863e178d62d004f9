use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::quiz::Answer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Auto-marked, waiting for grader feedback.
    Pending,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Graded => "graded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    #[sqlx(json)]
    pub answers: Vec<Answer>,
    pub score: i64,
    pub total: i64,
    pub status: SubmissionStatus,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

const SELECT_SUBMISSION: &str = r#"
SELECT id, user_id, category_id, answers, score, total, status, feedback, created_at, graded_at
FROM submissions
"#;

pub async fn create_submission(
    pool: &SqlitePool,
    user_id: i64,
    category_id: Option<i64>,
    answers: &[Answer],
    score: i64,
    total: i64,
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
INSERT INTO submissions (user_id, category_id, answers, score, total, status, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .bind(Json(answers))
    .bind(score)
    .bind(total)
    .bind(SubmissionStatus::Pending)
    .bind(Utc::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn get_submission(pool: &SqlitePool, id: i64) -> sqlx::Result<Submission> {
    sqlx::query_as::<_, Submission>(&format!("{SELECT_SUBMISSION} WHERE id = ?1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Newest first; `user_id` narrows the list to one student.
pub async fn list_submissions(pool: &SqlitePool, user_id: Option<i64>) -> sqlx::Result<Vec<Submission>> {
    sqlx::query_as::<_, Submission>(&format!(
        "{SELECT_SUBMISSION} WHERE ?1 IS NULL OR user_id = ?1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn save_feedback(pool: &SqlitePool, id: i64, feedback: &str) -> sqlx::Result<()> {
    let updated = sqlx::query(
        "UPDATE submissions SET feedback=?1, status=?2, graded_at=?3 WHERE submissions.id = ?4",
    )
    .bind(feedback)
    .bind(SubmissionStatus::Graded)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}
